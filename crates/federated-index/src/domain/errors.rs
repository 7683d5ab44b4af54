//! # Domain Errors
//!
//! Error types for the federated index.
//!
//! Direct single-target lookups surface these to the caller. Aggregating
//! operations swallow per-source failures and only fail when the viewer's
//! own identity cannot be resolved.

use thiserror::Error;

/// Failures reported by a store, blob store or locator adapter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Store, entry or blob does not exist.
    #[error("{what} not found")]
    NotFound {
        /// What was looked up
        what: String,
    },

    /// Address could not be resolved to an owner.
    #[error("cannot resolve {address}")]
    Unresolvable {
        /// The address as given
        address: String,
    },

    /// Backend I/O failure.
    #[error("I/O error: {0}")]
    Io(String),

    /// Stored bytes could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),
}

impl StoreError {
    /// Short label used for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            StoreError::NotFound { .. } => "not_found",
            StoreError::Unresolvable { .. } => "unresolvable",
            StoreError::Io(_) => "io",
            StoreError::Decode(_) => "decode",
        }
    }
}

/// Federated index error types.
#[derive(Debug, Error)]
pub enum FeedError {
    /// Requested store, entry or blob is absent.
    #[error("Not found: {0}")]
    NotFound(String),

    /// An address could not be turned into a stable owner identifier.
    #[error("Unresolvable address: {0}")]
    Unresolvable(String),

    /// An item or database URL failed to parse.
    #[error("Malformed reference: {0}")]
    MalformedReference(String),

    /// A cursor string is not a valid encoded time.
    #[error("Malformed cursor: {0}")]
    MalformedCursor(String),

    /// Caller supplied an unusable argument.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// An index value could not be decoded into its typed shape.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Underlying store failure on a single-target operation.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl From<serde_json::Error> for FeedError {
    fn from(err: serde_json::Error) -> Self {
        FeedError::Decode(err.to_string())
    }
}

impl FeedError {
    /// True for errors that mean "nothing there" rather than a broken source.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            FeedError::NotFound(_) | FeedError::Store(StoreError::NotFound { .. })
        )
    }
}
