//! # Cursor Codec
//!
//! Encodes millisecond timestamps as hex strings whose lexicographic order
//! matches numeric order, so they can be used directly as scan bounds.
//!
//! Layout: values below 251 are a single byte. Larger values store
//! `n - 251` big-endian behind a tag byte (251..=255) that names the width
//! (1, 2, 3, 4 or 8 bytes). A wider tag always sorts after a narrower one.

use chrono::{DateTime, TimeZone, Utc};

use crate::domain::{Cursor, FeedError, NotificationQuery, ScanWindow};

/// Values below this fit in the tag byte itself.
const INLINE_LIMIT: u64 = 251;

fn width_tag(x: u64) -> (u8, usize) {
    match x {
        0..=0xff => (251, 1),
        0x100..=0xffff => (252, 2),
        0x1_0000..=0xff_ffff => (253, 3),
        0x100_0000..=0xffff_ffff => (254, 4),
        _ => (255, 8),
    }
}

/// Encode a millisecond value.
pub fn encode_millis(n: u64) -> Cursor {
    let mut bytes = Vec::with_capacity(9);
    if n < INLINE_LIMIT {
        bytes.push(n as u8);
    } else {
        let x = n - INLINE_LIMIT;
        let (tag, width) = width_tag(x);
        bytes.push(tag);
        bytes.extend_from_slice(&x.to_be_bytes()[8 - width..]);
    }
    Cursor::new(hex::encode(bytes))
}

/// Decode a cursor produced by [`encode_millis`].
pub fn decode_millis(cursor: &str) -> Result<u64, FeedError> {
    let bytes = hex::decode(cursor)
        .map_err(|e| FeedError::MalformedCursor(format!("{cursor}: {e}")))?;
    let (tag, rest) = bytes
        .split_first()
        .ok_or_else(|| FeedError::MalformedCursor("empty cursor".to_string()))?;

    let width = match *tag {
        0..=250 => 0,
        251 => 1,
        252 => 2,
        253 => 3,
        254 => 4,
        _ => 8,
    };
    if rest.len() != width {
        return Err(FeedError::MalformedCursor(format!(
            "{cursor}: tag {tag} expects {width} bytes, found {}",
            rest.len()
        )));
    }
    if width == 0 {
        return Ok(u64::from(*tag));
    }

    let mut buf = [0u8; 8];
    buf[8 - width..].copy_from_slice(rest);
    u64::from_be_bytes(buf)
        .checked_add(INLINE_LIMIT)
        .ok_or_else(|| FeedError::MalformedCursor(format!("{cursor}: out of range")))
}

/// Encode a wall-clock time. Times before the epoch clamp to zero.
pub fn encode_time(at: DateTime<Utc>) -> Cursor {
    let millis = u64::try_from(at.timestamp_millis()).unwrap_or(0);
    encode_millis(millis)
}

/// Decode a cursor back into a wall-clock time.
pub fn decode_time(cursor: &str) -> Result<DateTime<Utc>, FeedError> {
    let millis = decode_millis(cursor)?;
    let millis = i64::try_from(millis)
        .map_err(|_| FeedError::MalformedCursor(format!("{cursor}: out of range")))?;
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| FeedError::MalformedCursor(format!("{cursor}: out of range")))
}

fn non_empty(cursor: Option<&Cursor>) -> Option<Cursor> {
    cursor.filter(|c| !c.as_str().is_empty()).cloned()
}

/// Resolve a query's bounds: raw cursors win over wall-clock bounds.
///
/// An empty raw cursor counts as unset.
pub fn resolve_window(query: &NotificationQuery) -> ScanWindow {
    ScanWindow {
        lt: non_empty(query.lt.as_ref()).or_else(|| query.before.map(encode_time)),
        gt: non_empty(query.gt.as_ref()).or_else(|| query.after.map(encode_time)),
    }
}
