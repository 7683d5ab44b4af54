//! # Federated Index
//!
//! Read-side aggregation over per-owner ordered key-value stores.
//!
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Purpose
//!
//! Every person and every community owns a store that only they write.
//! Activity about one subject is therefore scattered: a viewer's
//! notifications live partly in their private index and partly in each
//! community index they belong to. This crate reads all of those places and
//! returns one deduplicated, time-ordered, paginated view:
//! - Notifications, merged across sources and hydrated with their items
//! - Reactions, unioned tag by tag with voters resolved to owner ids
//! - Reply threads, concatenated and deduplicated by item URL
//! - Follower sets from private and community indexes
//!
//! ## Partial Failure
//!
//! | Situation | Outcome |
//! |-----------|---------|
//! | Community store not open locally | Source contributes nothing |
//! | Source read fails | Logged, source contributes nothing |
//! | Notification item origin unresolvable | Notification dropped |
//! | Notification item unreadable | Notification kept without item |
//! | Direct lookup (`get_entry_at`, `get_blob`) misses | Error returned |
//!
//! ## Module Structure
//!
//! ```text
//! federated-index/
//! ├── domain/          # Entries, typed index values, errors, invariants
//! ├── algorithms/      # Cursor codec, merge/dedup/paginate, reconciler, blend
//! ├── ports/           # API trait (inbound) + store traits (outbound)
//! ├── adapters/        # In-memory stores and the store registry
//! ├── application/     # Reader, hydrator and FederatedFeedService
//! ├── urls.rs          # Owner/item URL helpers
//! └── config.rs        # FederationConfig
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod algorithms;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
pub mod urls;

// Re-exports
pub use adapters::{MemoryBlobStore, MemoryStore, StoreRegistry};
pub use algorithms::{
    blended_created_at, concat_uniq, decode_millis, decode_time, encode_millis, encode_time,
    merge_page, merge_reactions, merge_threads,
};
pub use application::{FanOut, FederatedFeedService, FederatedIndexReader, NotificationHydrator};
pub use config::FederationConfig;
pub use domain::{
    Author, AuthorCache, AuthorRef, BlobContent, BlobEncoding, Cursor, FeedError,
    HydratedNotification, IndexName, ItemRef, NotificationEntry, NotificationQuery, OwnerId,
    ReactionSummary, SourceOutcome, StoreEntry, StoreError, Subject, ViewerInfo,
    DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT,
};
pub use ports::{BlobStore, EntryAt, FederatedFeedApi, OwnerStore, StoreHandle, StoreLocator};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
