//! # Notification Hydrator
//!
//! Turns merged notification entries into full notifications by reading the
//! item each one points at from its origin store.

use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::debug;

use feed_telemetry::{metric_inc, FEED_HYDRATION_DROPS};

use crate::algorithms::blended_created_at;
use crate::domain::{AuthorRef, HydratedNotification, NotificationEntry};
use crate::ports::StoreLocator;
use crate::urls::{owner_url, parse_item_url};

/// Dereferences notification items through a locator.
pub struct NotificationHydrator<L: StoreLocator> {
    locator: Arc<L>,
    concurrency: usize,
}

impl<L: StoreLocator> NotificationHydrator<L> {
    /// Create a hydrator reading `concurrency` items at once.
    pub fn new(locator: Arc<L>, concurrency: usize) -> Self {
        Self {
            locator,
            concurrency: concurrency.max(1),
        }
    }

    /// Hydrate a page, keeping its order.
    ///
    /// Entries whose item URL is malformed or whose origin does not resolve
    /// are dropped. Entries whose item cannot be read are kept without it.
    pub async fn hydrate(&self, entries: Vec<NotificationEntry>) -> Vec<HydratedNotification> {
        let hydrated: Vec<Option<HydratedNotification>> = stream::iter(entries)
            .map(|entry| self.hydrate_one(entry))
            .buffered(self.concurrency)
            .collect()
            .await;
        hydrated.into_iter().flatten().collect()
    }

    async fn hydrate_one(&self, entry: NotificationEntry) -> Option<HydratedNotification> {
        let item_url = &entry.value.item_url;
        let parsed = match parse_item_url(item_url) {
            Ok(parsed) => parsed,
            Err(e) => {
                debug!(item = %item_url, error = %e, "[feed] dropping notification");
                metric_inc!(FEED_HYDRATION_DROPS);
                return None;
            }
        };
        let owner = match self.locator.resolve_owner_id(&parsed.origin).await {
            Ok(owner) => owner,
            Err(e) => {
                debug!(item = %item_url, error = %e, "[feed] dropping notification");
                metric_inc!(FEED_HYDRATION_DROPS);
                return None;
            }
        };

        let mut item = None;
        if let Some(store) = self.locator.public_store(&owner) {
            match store.table(&parsed.schema_id).get(&parsed.key).await {
                Ok(found) => item = found.map(|e| e.value),
                Err(e) => debug!(item = %item_url, error = %e, "[feed] item unreadable"),
            }
        }

        let blended = blended_created_at(entry.value.created_at, item.as_ref());
        Some(HydratedNotification {
            key: entry.cursor().to_string(),
            item_url: entry.value.item_url.clone(),
            created_at: entry.value.created_at,
            blended_created_at: blended,
            author: AuthorRef {
                url: owner_url(&owner),
                user_id: owner,
            },
            item,
        })
    }
}
