//! # Federated Index Reader
//!
//! Fans a request out to every store that may hold part of the answer: the
//! viewer's private index and each community index the viewer belongs to.
//!
//! A store that is missing, or that fails, contributes nothing. The only
//! hard failure is a viewer whose own database URL cannot be scoped.

use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{debug, warn};

use feed_telemetry::{
    metric_inc, time_histogram, FEED_FANOUT_DURATION, FEED_SOURCES_QUERIED, FEED_SOURCE_FAILURES,
};

use crate::algorithms::resolve_window;
use crate::config::FederationConfig;
use crate::domain::{
    clamp_limit, FeedError, IndexName, ListRange, MembershipValue, NotificationQuery, OwnerId,
    SourceOutcome, StoreEntry, StoreError, ViewerInfo,
};
use crate::ports::{OwnerStore, StoreLocator};
use crate::urls::store_scope_key;

/// Concatenated per-source results of one range query.
#[derive(Clone, Debug, PartialEq)]
pub struct FanOut {
    /// Page limit after clamping.
    pub limit: usize,
    /// Entries in source-declaration order, each source newest first.
    pub entries: Vec<StoreEntry>,
}

/// Reads logical indexes across a viewer's federated stores.
pub struct FederatedIndexReader<L: StoreLocator> {
    locator: Arc<L>,
    config: FederationConfig,
}

impl<L: StoreLocator> FederatedIndexReader<L> {
    /// Create a reader over `locator`.
    pub fn new(locator: Arc<L>, config: FederationConfig) -> Self {
        Self { locator, config }
    }

    /// Active configuration.
    pub fn config(&self) -> &FederationConfig {
        &self.config
    }

    /// Range query over the viewer's private index and every community
    /// index the viewer belongs to. Results are not merged.
    pub async fn query_index(
        &self,
        viewer: &ViewerInfo,
        index: IndexName,
        query: &NotificationQuery,
    ) -> Result<FanOut, FeedError> {
        let limit = clamp_limit(
            query.limit,
            self.config.default_page_limit,
            self.config.max_page_limit,
        );
        let window = resolve_window(query);
        let scope = store_scope_key(&viewer.db_url)?;

        let mut sources: Vec<(OwnerStore, ListRange)> = Vec::new();
        if let Some(private) = self.locator.private_store(&viewer.user_id) {
            sources.push((private, window.to_range(limit)));
        }
        for community in self.community_stores(&viewer.user_id).await {
            sources.push((community, window.to_scoped_range(&scope, limit)));
        }

        debug!(
            viewer = %viewer.user_id,
            index = %index,
            sources = sources.len(),
            limit,
            "[feed] fanning out range query"
        );

        let _timer = time_histogram!(FEED_FANOUT_DURATION);
        let pages: Vec<Vec<StoreEntry>> = stream::iter(sources)
            .map(|(store, range)| self.scan(store, index, range))
            .buffered(self.config.fanout_concurrency.max(1))
            .collect()
            .await;

        Ok(FanOut {
            limit,
            entries: pages.into_iter().flatten().collect(),
        })
    }

    /// Point read of `key` in one table of one store.
    ///
    /// `None` for the store means the source is not available locally.
    pub async fn lookup(
        &self,
        store: Option<&OwnerStore>,
        table: &str,
        key: &str,
    ) -> SourceOutcome<StoreEntry> {
        let Some(store) = store else {
            return SourceOutcome::Absent;
        };
        metric_inc!(FEED_SOURCES_QUERIED, &[table]);
        let outcome = SourceOutcome::from_lookup(store.table(table).get(key).await);
        if let SourceOutcome::SourceError(e) = &outcome {
            self.record_failure(&store.owner_id, table, e);
        }
        outcome
    }

    /// Public stores of the communities `member` belongs to, in membership
    /// order. Communities without a local store are skipped.
    pub async fn community_stores(&self, member: &OwnerId) -> Vec<OwnerStore> {
        let Some(public) = self.locator.public_store(member) else {
            return Vec::new();
        };
        let memberships = match public.table("memberships").list(ListRange::all()).await {
            Ok(entries) => entries,
            Err(e) => {
                self.record_failure(member, "memberships", &e);
                return Vec::new();
            }
        };

        if memberships.len() > self.config.max_memberships {
            warn!(
                owner = %member,
                memberships = memberships.len(),
                max = self.config.max_memberships,
                "[feed] membership list truncated"
            );
        }

        memberships
            .iter()
            .take(self.config.max_memberships)
            .filter_map(|entry| match entry.decode::<MembershipValue>() {
                Ok(m) => Some(m.community.user_id),
                Err(e) => {
                    warn!(owner = %member, key = %entry.key, error = %e, "[feed] skipping membership");
                    None
                }
            })
            .filter_map(|community| self.locator.public_store(&community))
            .collect()
    }

    async fn scan(&self, store: OwnerStore, index: IndexName, range: ListRange) -> Vec<StoreEntry> {
        metric_inc!(FEED_SOURCES_QUERIED, &[index.table()]);
        match store.table(index.table()).list(range).await {
            Ok(entries) => entries,
            Err(e) => {
                self.record_failure(&store.owner_id, index.table(), &e);
                Vec::new()
            }
        }
    }

    fn record_failure(&self, owner: &OwnerId, table: &str, error: &StoreError) {
        warn!(owner = %owner, index = table, error = %error, "[feed] source contributed nothing");
        metric_inc!(FEED_SOURCE_FAILURES, &[table, error.reason()]);
    }
}
