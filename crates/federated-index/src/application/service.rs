//! # Federated Feed Service
//!
//! Application service behind [`FederatedFeedApi`]: wires the reader, the
//! merge pipeline, the reconciler and the hydrator together.

use async_trait::async_trait;
use futures::future::join_all;
use futures::stream::{self, StreamExt};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use feed_telemetry::{FEED_NOTIFICATIONS_SERVED, FEED_VOTERS_DROPPED};

use super::federated_reader::FederatedIndexReader;
use super::hydrator::NotificationHydrator;
use crate::algorithms::{dedup_first_seen, merge_page, merge_reactions, merge_threads};
use crate::config::FederationConfig;
use crate::domain::{
    invariant_descending, invariant_page_bounded, Author, AuthorCache, BlobContent, BlobEncoding,
    FeedError, FollowsIdxValue, HydratedNotification, IndexName, ItemRef, NotificationEntry,
    NotificationQuery, OwnerId, ProfileValue, ReactionIdxValue, ReactionSummary, SourceOutcome,
    StoreEntry, StoreError, Subject, ThreadIdxValue, ViewerInfo,
};
use crate::ports::{EntryAt, FederatedFeedApi, OwnerStore, StoreLocator};
use crate::urls::{owner_url, path_segments, OWNER_URL_SCHEME};

/// Table and key of an owner's profile record.
const PROFILE_TABLE: &str = "profile";
const PROFILE_KEY: &str = "self";

fn thread_items(outcome: SourceOutcome<StoreEntry>) -> Option<Vec<ItemRef>> {
    outcome
        .and_then_decode(|e| e.decode::<ThreadIdxValue>())
        .found()
        .map(|v| v.items)
}

/// Federated feed service.
pub struct FederatedFeedService<L: StoreLocator> {
    locator: Arc<L>,
    reader: FederatedIndexReader<L>,
    hydrator: NotificationHydrator<L>,
}

impl<L: StoreLocator> FederatedFeedService<L> {
    /// Create a service over `locator`.
    pub fn new(locator: Arc<L>, config: FederationConfig) -> Result<Self, FeedError> {
        config.validate()?;
        let hydrator = NotificationHydrator::new(Arc::clone(&locator), config.hydration_concurrency);
        let reader = FederatedIndexReader::new(Arc::clone(&locator), config);
        Ok(Self {
            locator,
            reader,
            hydrator,
        })
    }

    /// The underlying federated reader.
    pub fn reader(&self) -> &FederatedIndexReader<L> {
        &self.reader
    }

    async fn resolve(&self, address: &str) -> Result<OwnerId, FeedError> {
        self.locator
            .resolve_owner_id(address)
            .await
            .map_err(|e| match e {
                StoreError::Unresolvable { address } => FeedError::Unresolvable(address),
                other => FeedError::Store(other),
            })
    }

    fn public_store(&self, owner: &OwnerId) -> Result<OwnerStore, FeedError> {
        self.locator
            .public_store(owner)
            .ok_or_else(|| FeedError::NotFound(format!("user database {owner}")))
    }

    /// Primary source for a subject: its community's public index, or its
    /// author's private index. Plus the viewer's private index, unless the
    /// viewer is the author already consulted.
    fn subject_sources(
        &self,
        subject: &Subject,
        viewer: Option<&OwnerId>,
    ) -> (Option<OwnerStore>, Option<OwnerStore>) {
        match &subject.community_id {
            Some(community) => (
                self.locator.public_store(community),
                viewer.and_then(|v| self.locator.private_store(v)),
            ),
            None => (
                subject
                    .author_id
                    .as_ref()
                    .and_then(|a| self.locator.private_store(a)),
                viewer
                    .filter(|v| subject.author_id.as_ref() != Some(*v))
                    .and_then(|v| self.locator.private_store(v)),
            ),
        }
    }

    /// Merged, deduplicated, truncated page. Shared by listing and counting.
    async fn notification_page(
        &self,
        viewer: &ViewerInfo,
        query: &NotificationQuery,
    ) -> Result<Vec<NotificationEntry>, FeedError> {
        let fan = self
            .reader
            .query_index(viewer, IndexName::Notifications, query)
            .await?;

        let entries: Vec<NotificationEntry> = fan
            .entries
            .iter()
            .filter_map(|raw| match NotificationEntry::try_from(raw) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    debug!(key = %raw.key, error = %e, "[feed] skipping notification entry");
                    None
                }
            })
            .collect();

        let page = merge_page(entries, fan.limit);
        debug_assert!(invariant_page_bounded(page.len(), fan.limit).is_ok());
        debug_assert!(invariant_descending(
            &page.iter().map(|e| e.key.as_str()).collect::<Vec<_>>()
        )
        .is_ok());
        Ok(page)
    }

    async fn resolve_voters(&self, urls: &[String]) -> Vec<OwnerId> {
        let resolved = join_all(urls.iter().map(|url| self.locator.resolve_owner_id(url))).await;
        let total = resolved.len();
        let ids: Vec<OwnerId> = resolved.into_iter().filter_map(Result::ok).collect();
        if ids.len() < total {
            debug!(dropped = total - ids.len(), "[feed] unresolvable voters dropped");
            FEED_VOTERS_DROPPED.inc_by((total - ids.len()) as f64);
        }
        dedup_first_seen(ids, OwnerId::clone)
    }
}

#[async_trait]
impl<L: StoreLocator> FederatedFeedApi for FederatedFeedService<L> {
    async fn get_entry_at(&self, url: &str) -> Result<EntryAt, FeedError> {
        let (host, segments) = path_segments(url)?;
        let Some((key, tables)) = segments.split_last() else {
            return Err(FeedError::MalformedReference(format!("{url}: no key in path")));
        };

        let owner = self.resolve(&format!("{OWNER_URL_SCHEME}{host}/")).await?;
        let store = self.public_store(&owner)?;
        let handle = tables
            .iter()
            .fold(Arc::clone(&store.root), |handle, table| handle.sub(table));
        let entry = handle
            .get(key)
            .await?
            .ok_or_else(|| FeedError::NotFound(format!("entry {url}")))?;
        Ok(EntryAt { store, entry })
    }

    async fn get_blob(
        &self,
        owner_ref: &str,
        name: &str,
        encoding: BlobEncoding,
    ) -> Result<BlobContent, FeedError> {
        if name.is_empty() {
            return Err(FeedError::InvalidArgument("must specify a blob name".to_string()));
        }
        let owner = self.resolve(owner_ref).await?;
        let store = self.public_store(&owner)?;
        let blobs = store
            .blobs
            .as_ref()
            .ok_or_else(|| FeedError::NotFound(format!("blob store of {owner}")))?;
        let bytes = blobs.get(name).await?;

        Ok(match encoding {
            BlobEncoding::Raw => BlobContent::Bytes(bytes),
            BlobEncoding::Utf8 => BlobContent::Text(
                String::from_utf8(bytes)
                    .map_err(|e| FeedError::Decode(format!("blob {name}: {e}")))?,
            ),
            BlobEncoding::Hex => BlobContent::Text(hex::encode(bytes)),
        })
    }

    async fn resolve_author(
        &self,
        owner: &OwnerId,
        cache: Option<&mut AuthorCache>,
    ) -> Result<Author, FeedError> {
        if let Some(hit) = cache.as_ref().and_then(|c| c.get(owner)) {
            return Ok(hit.clone());
        }

        let store = self.locator.public_store(owner);
        let display_name = self
            .reader
            .lookup(store.as_ref(), PROFILE_TABLE, PROFILE_KEY)
            .await
            .and_then_decode(|e| e.decode::<ProfileValue>())
            .found()
            .and_then(|p| p.display_name)
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| owner.to_string());

        let author = Author {
            url: owner_url(owner),
            user_id: owner.clone(),
            display_name,
        };
        if let Some(cache) = cache {
            cache.insert(author.clone());
        }
        Ok(author)
    }

    async fn list_follower_ids(
        &self,
        subject: &OwnerId,
        viewer: &OwnerId,
    ) -> Result<Vec<OwnerId>, FeedError> {
        let store = self.locator.private_store(viewer);
        Ok(self
            .reader
            .lookup(store.as_ref(), IndexName::Follows.table(), subject.as_str())
            .await
            .and_then_decode(|e| e.decode::<FollowsIdxValue>())
            .found()
            .map(|v| v.follower_ids)
            .unwrap_or_default())
    }

    async fn list_community_follower_ids(
        &self,
        subject: &OwnerId,
        member: &OwnerId,
    ) -> Result<Vec<OwnerId>, FeedError> {
        let communities = self.reader.community_stores(member).await;
        let lists: Vec<Vec<OwnerId>> = stream::iter(communities)
            .map(move |community| async move {
                self.reader
                    .lookup(Some(&community), IndexName::Follows.table(), subject.as_str())
                    .await
                    .and_then_decode(|e| e.decode::<FollowsIdxValue>())
                    .found()
                    .map(|v| v.follower_ids)
                    .unwrap_or_default()
            })
            .buffered(self.reader.config().fanout_concurrency.max(1))
            .collect()
            .await;

        Ok(dedup_first_seen(
            lists.into_iter().flatten().collect(),
            OwnerId::clone,
        ))
    }

    async fn get_reactions(
        &self,
        subject: &Subject,
        viewer: Option<&OwnerId>,
    ) -> Result<ReactionSummary, FeedError> {
        let (primary, own) = self.subject_sources(subject, viewer);
        let table = IndexName::Reactions.table();
        let (primary, own) = futures::join!(
            self.reader.lookup(primary.as_ref(), table, &subject.url),
            self.reader.lookup(own.as_ref(), table, &subject.url),
        );
        let primary = primary
            .and_then_decode(|e| e.decode::<ReactionIdxValue>())
            .found();
        let own = own.and_then_decode(|e| e.decode::<ReactionIdxValue>()).found();

        let by_url = merge_reactions(
            primary.as_ref().map(|v| &v.reactions),
            own.as_ref().map(|v| &v.reactions),
        );
        let descriptor = primary
            .and_then(|v| v.subject)
            .or_else(|| own.and_then(|v| v.subject))
            .unwrap_or_else(|| ItemRef::bare(subject.url.clone()));

        let resolved = join_all(by_url.values().map(|urls| self.resolve_voters(urls))).await;
        let reactions: BTreeMap<String, Vec<OwnerId>> =
            by_url.into_keys().zip(resolved).collect();

        Ok(ReactionSummary {
            subject: descriptor,
            reactions,
        })
    }

    async fn get_replies(
        &self,
        subject: &Subject,
        viewer: Option<&OwnerId>,
    ) -> Result<Vec<ItemRef>, FeedError> {
        let (primary, own) = self.subject_sources(subject, viewer);
        let table = IndexName::Threads.table();
        let (primary, own) = futures::join!(
            self.reader.lookup(primary.as_ref(), table, &subject.url),
            self.reader.lookup(own.as_ref(), table, &subject.url),
        );
        Ok(merge_threads(thread_items(primary), thread_items(own)))
    }

    async fn get_reply_count(
        &self,
        subject: &Subject,
        viewer: Option<&OwnerId>,
    ) -> Result<usize, FeedError> {
        Ok(self.get_replies(subject, viewer).await?.len())
    }

    async fn list_notifications(
        &self,
        viewer: &ViewerInfo,
        query: &NotificationQuery,
    ) -> Result<Vec<HydratedNotification>, FeedError> {
        let page = self.notification_page(viewer, query).await?;
        let hydrated = self.hydrator.hydrate(page).await;
        FEED_NOTIFICATIONS_SERVED.inc_by(hydrated.len() as f64);
        Ok(hydrated)
    }

    async fn count_notifications(
        &self,
        viewer: &ViewerInfo,
        query: &NotificationQuery,
    ) -> Result<usize, FeedError> {
        Ok(self.notification_page(viewer, query).await?.len())
    }
}
