//! # Domain Value Objects
//!
//! Immutable value types: owner identifiers, cursors, index names, scan
//! windows and query options.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::invariants::{COMPOUND_KEY_SEPARATOR, SCOPE_HIGH_SENTINEL, SCOPE_LOW_SENTINEL};

/// Stable identity of a person or community, independent of network address.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(String);

impl OwnerId {
    /// Wrap an owner identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow as a plain string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OwnerId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for OwnerId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Lexicographically sortable encoding of a point in time.
///
/// Used as a range bound and as a sort key, never as a content identity.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(String);

impl Cursor {
    /// Wrap a raw cursor string (e.g. one handed back by a previous page).
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Borrow as a plain string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Logical index sub-namespaces consulted by the reader.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndexName {
    /// Time-keyed notification entries.
    Notifications,
    /// Reaction tallies keyed by subject URL.
    Reactions,
    /// Reply lists keyed by subject URL.
    Threads,
    /// Follower sets keyed by followed owner id.
    Follows,
}

impl IndexName {
    /// Sub-namespace name inside an owner store.
    pub fn table(&self) -> &'static str {
        match self {
            IndexName::Notifications => "notificationsIdx",
            IndexName::Reactions => "reactionsIdx",
            IndexName::Threads => "threadIdx",
            IndexName::Follows => "followsIdx",
        }
    }
}

impl fmt::Display for IndexName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

/// Range scan options handed to a store.
///
/// Bounds are exclusive. `reverse` yields keys in descending order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ListRange {
    /// Exclusive upper bound.
    pub lt: Option<String>,
    /// Exclusive lower bound.
    pub gt: Option<String>,
    /// Maximum number of entries to return.
    pub limit: Option<usize>,
    /// Scan from the highest key downwards.
    pub reverse: bool,
}

impl ListRange {
    /// Unbounded ascending scan.
    pub fn all() -> Self {
        Self::default()
    }
}

/// Resolved cursor bounds for one notification request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScanWindow {
    /// Exclusive upper bound cursor.
    pub lt: Option<Cursor>,
    /// Exclusive lower bound cursor.
    pub gt: Option<Cursor>,
}

impl ScanWindow {
    /// Range for a private, pure-cursor keyed index.
    pub fn to_range(&self, limit: usize) -> ListRange {
        ListRange {
            lt: self.lt.as_ref().map(|c| c.as_str().to_string()),
            gt: self.gt.as_ref().map(|c| c.as_str().to_string()),
            limit: Some(limit),
            reverse: true,
        }
    }

    /// Range for a shared community index whose keys are `<scope>:<cursor>`.
    ///
    /// Open bounds are closed with sentinels so the scan never leaves the
    /// viewer's key prefix.
    pub fn to_scoped_range(&self, scope: &str, limit: usize) -> ListRange {
        let lt = match &self.lt {
            Some(c) => format!("{scope}{COMPOUND_KEY_SEPARATOR}{c}"),
            None => format!("{scope}{COMPOUND_KEY_SEPARATOR}{SCOPE_HIGH_SENTINEL}"),
        };
        let gt = match &self.gt {
            Some(c) => format!("{scope}{COMPOUND_KEY_SEPARATOR}{c}"),
            None => format!("{scope}{COMPOUND_KEY_SEPARATOR}{SCOPE_LOW_SENTINEL}"),
        };
        ListRange {
            lt: Some(lt),
            gt: Some(gt),
            limit: Some(limit),
            reverse: true,
        }
    }
}

/// Caller options for notification listing and counting.
///
/// Raw cursors take precedence over wall-clock bounds.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NotificationQuery {
    /// Raw exclusive upper cursor.
    pub lt: Option<Cursor>,
    /// Raw exclusive lower cursor.
    pub gt: Option<Cursor>,
    /// Wall-clock exclusive upper bound.
    pub before: Option<DateTime<Utc>>,
    /// Wall-clock exclusive lower bound.
    pub after: Option<DateTime<Utc>>,
    /// Requested page size (clamped).
    pub limit: Option<usize>,
}

impl NotificationQuery {
    /// Empty query: newest page, default limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the raw upper cursor.
    pub fn lt(mut self, cursor: impl Into<String>) -> Self {
        self.lt = Some(Cursor::new(cursor));
        self
    }

    /// Set the raw lower cursor.
    pub fn gt(mut self, cursor: impl Into<String>) -> Self {
        self.gt = Some(Cursor::new(cursor));
        self
    }

    /// Set the wall-clock upper bound.
    pub fn before(mut self, at: DateTime<Utc>) -> Self {
        self.before = Some(at);
        self
    }

    /// Set the wall-clock lower bound.
    pub fn after(mut self, at: DateTime<Utc>) -> Self {
        self.after = Some(at);
        self
    }

    /// Set the requested page size.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Encoding applied to blob bytes before they are handed back.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlobEncoding {
    /// Bytes as stored.
    #[default]
    Raw,
    /// Bytes interpreted as UTF-8 text.
    Utf8,
    /// Bytes rendered as lowercase hex text.
    Hex,
}

/// Blob content in the requested encoding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BlobContent {
    /// Raw bytes.
    Bytes(Vec<u8>),
    /// Text rendering (UTF-8 or hex).
    Text(String),
}

impl BlobContent {
    /// Length of the payload in bytes.
    pub fn len(&self) -> usize {
        match self {
            BlobContent::Bytes(b) => b.len(),
            BlobContent::Text(s) => s.len(),
        }
    }

    /// True when the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
