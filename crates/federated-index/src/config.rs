//! # Federation Configuration
//!
//! Page limits and fan-out bounds for the federated reader.

use serde::{Deserialize, Serialize};
use std::env;

use crate::domain::{FeedError, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};

/// Federated reader configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FederationConfig {
    /// Page size when the caller gives none.
    pub default_page_limit: usize,

    /// Largest page a caller may request. Never above 20.
    pub max_page_limit: usize,

    /// Memberships consulted per request. Extra memberships are ignored.
    pub max_memberships: usize,

    /// Sources scanned at once during fan-out.
    pub fanout_concurrency: usize,

    /// Notifications hydrated at once.
    pub hydration_concurrency: usize,
}

impl Default for FederationConfig {
    fn default() -> Self {
        Self {
            default_page_limit: DEFAULT_PAGE_LIMIT,
            max_page_limit: MAX_PAGE_LIMIT,
            max_memberships: 256,
            fanout_concurrency: 16,
            hydration_concurrency: 16,
        }
    }
}

impl FederationConfig {
    /// Create a config for testing (small fan-out).
    pub fn for_testing() -> Self {
        Self {
            max_memberships: 8,
            fanout_concurrency: 2,
            hydration_concurrency: 2,
            ..Self::default()
        }
    }

    /// Read overrides from the environment.
    ///
    /// # Environment Variables
    ///
    /// - `FEED_DEFAULT_PAGE_LIMIT` (default: 20)
    /// - `FEED_MAX_PAGE_LIMIT` (default: 20)
    /// - `FEED_MAX_MEMBERSHIPS` (default: 256)
    /// - `FEED_FANOUT_CONCURRENCY` (default: 16)
    /// - `FEED_HYDRATION_CONCURRENCY` (default: 16)
    ///
    /// Unparsable values fall back to the default.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let read = |name: &str, fallback: usize| {
            env::var(name)
                .ok()
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(fallback)
        };

        Self {
            default_page_limit: read("FEED_DEFAULT_PAGE_LIMIT", defaults.default_page_limit),
            max_page_limit: read("FEED_MAX_PAGE_LIMIT", defaults.max_page_limit),
            max_memberships: read("FEED_MAX_MEMBERSHIPS", defaults.max_memberships),
            fanout_concurrency: read("FEED_FANOUT_CONCURRENCY", defaults.fanout_concurrency),
            hydration_concurrency: read(
                "FEED_HYDRATION_CONCURRENCY",
                defaults.hydration_concurrency,
            ),
        }
    }

    /// Reject settings the reader cannot run with.
    pub fn validate(&self) -> Result<(), FeedError> {
        let positive = [
            ("default_page_limit", self.default_page_limit),
            ("max_page_limit", self.max_page_limit),
            ("fanout_concurrency", self.fanout_concurrency),
            ("hydration_concurrency", self.hydration_concurrency),
        ];
        if let Some((name, _)) = positive.iter().find(|(_, v)| *v == 0) {
            return Err(FeedError::InvalidArgument(format!("{name} must be positive")));
        }
        if self.max_page_limit > MAX_PAGE_LIMIT {
            return Err(FeedError::InvalidArgument(format!(
                "max_page_limit {} exceeds {MAX_PAGE_LIMIT}",
                self.max_page_limit
            )));
        }
        if self.default_page_limit > self.max_page_limit {
            return Err(FeedError::InvalidArgument(format!(
                "default_page_limit {} exceeds max_page_limit {}",
                self.default_page_limit, self.max_page_limit
            )));
        }
        Ok(())
    }
}
