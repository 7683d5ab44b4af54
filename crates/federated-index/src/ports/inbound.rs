//! # Inbound Ports
//!
//! The read API the federated index offers to presentation layers.

use async_trait::async_trait;

use super::outbound::OwnerStore;
use crate::domain::{
    Author, AuthorCache, BlobContent, BlobEncoding, FeedError, HydratedNotification, ItemRef,
    NotificationQuery, OwnerId, ReactionSummary, StoreEntry, Subject, ViewerInfo,
};

/// Result of a direct entry lookup.
#[derive(Clone, Debug)]
pub struct EntryAt {
    /// Store the entry lives in.
    pub store: OwnerStore,
    /// The entry.
    pub entry: StoreEntry,
}

/// Federated feed API - inbound port.
///
/// Single-target lookups fail loudly. Aggregations tolerate missing or
/// failing sources and only fail when the viewer's own identity is unusable.
#[async_trait]
pub trait FederatedFeedApi: Send + Sync {
    /// Read the entry an item URL points at.
    async fn get_entry_at(&self, url: &str) -> Result<EntryAt, FeedError>;

    /// Read a blob from an owner's store.
    async fn get_blob(
        &self,
        owner_ref: &str,
        name: &str,
        encoding: BlobEncoding,
    ) -> Result<BlobContent, FeedError>;

    /// Author descriptor for an owner, memoized in `cache` when given.
    async fn resolve_author(
        &self,
        owner: &OwnerId,
        cache: Option<&mut AuthorCache>,
    ) -> Result<Author, FeedError>;

    /// Followers of `subject` recorded in the viewer's private index.
    async fn list_follower_ids(
        &self,
        subject: &OwnerId,
        viewer: &OwnerId,
    ) -> Result<Vec<OwnerId>, FeedError>;

    /// Followers of `subject` recorded across the member's communities.
    async fn list_community_follower_ids(
        &self,
        subject: &OwnerId,
        member: &OwnerId,
    ) -> Result<Vec<OwnerId>, FeedError>;

    /// Merged reactions on a subject.
    async fn get_reactions(
        &self,
        subject: &Subject,
        viewer: Option<&OwnerId>,
    ) -> Result<ReactionSummary, FeedError>;

    /// Merged replies to a subject.
    async fn get_replies(
        &self,
        subject: &Subject,
        viewer: Option<&OwnerId>,
    ) -> Result<Vec<ItemRef>, FeedError>;

    /// Number of merged replies.
    async fn get_reply_count(
        &self,
        subject: &Subject,
        viewer: Option<&OwnerId>,
    ) -> Result<usize, FeedError>;

    /// One page of hydrated notifications, newest first.
    async fn list_notifications(
        &self,
        viewer: &ViewerInfo,
        query: &NotificationQuery,
    ) -> Result<Vec<HydratedNotification>, FeedError>;

    /// Size of the same page, without hydration.
    async fn count_notifications(
        &self,
        viewer: &ViewerInfo,
        query: &NotificationQuery,
    ) -> Result<usize, FeedError>;
}
