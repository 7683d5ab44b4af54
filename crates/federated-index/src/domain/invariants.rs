//! # Domain Invariants
//!
//! Rules every page and every key must satisfy.

use super::errors::FeedError;

/// Smallest page a caller can request.
pub const MIN_PAGE_LIMIT: usize = 1;

/// Largest page a caller can request.
pub const MAX_PAGE_LIMIT: usize = 20;

/// Page size used when the caller does not ask for one.
pub const DEFAULT_PAGE_LIMIT: usize = 20;

/// Separates the subscriber scope from the cursor in community index keys.
pub const COMPOUND_KEY_SEPARATOR: char = ':';

/// Lowest possible cursor suffix within a scope.
pub const SCOPE_LOW_SENTINEL: char = '\u{0}';

/// Highest possible cursor suffix within a scope.
pub const SCOPE_HIGH_SENTINEL: char = '\u{ff}';

/// Clamp a requested page size into `[MIN_PAGE_LIMIT, max]`.
///
/// Zero and missing limits fall back to `default`. `max` itself never
/// lifts the ceiling above `MAX_PAGE_LIMIT`.
pub fn clamp_limit(requested: Option<usize>, default: usize, max: usize) -> usize {
    let wanted = match requested {
        Some(0) | None => default,
        Some(n) => n,
    };
    wanted.min(max).min(MAX_PAGE_LIMIT).max(MIN_PAGE_LIMIT)
}

/// Cursor portion of an index key.
///
/// Compound keys carry the cursor after the first separator; plain keys
/// are cursors already.
pub fn effective_cursor(key: &str) -> &str {
    match key.split_once(COMPOUND_KEY_SEPARATOR) {
        Some((_, cursor)) => cursor,
        None => key,
    }
}

/// Invariant: a page is ordered by descending effective cursor.
pub fn invariant_descending<K: AsRef<str>>(keys: &[K]) -> Result<(), FeedError> {
    for pair in keys.windows(2) {
        let (a, b) = (effective_cursor(pair[0].as_ref()), effective_cursor(pair[1].as_ref()));
        if a < b {
            return Err(FeedError::InvalidArgument(format!(
                "page out of order: {a} before {b}"
            )));
        }
    }
    Ok(())
}

/// Invariant: a page never exceeds its limit.
pub fn invariant_page_bounded(len: usize, limit: usize) -> Result<(), FeedError> {
    if len > limit {
        return Err(FeedError::InvalidArgument(format!(
            "page holds {len} entries, limit is {limit}"
        )));
    }
    Ok(())
}
