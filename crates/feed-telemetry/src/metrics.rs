//! Prometheus metrics for the federated feed.
//!
//! All metrics follow the naming convention: `feed_<area>_<metric>_<unit>`
//!
//! ## Metric Types
//!
//! - **Counter**: Monotonically increasing value (e.g., notifications_served_total)
//! - **Histogram**: Distribution of values (e.g., fanout_duration_seconds)

use lazy_static::lazy_static;
use prometheus::{Counter, CounterVec, Encoder, Histogram, HistogramOpts, Opts, Registry, TextEncoder};
use std::sync::Arc;

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // FAN-OUT METRICS
    // =========================================================================

    /// Sources consulted, by index
    pub static ref FEED_SOURCES_QUERIED: CounterVec = CounterVec::new(
        Opts::new("feed_sources_queried_total", "Federated sources consulted"),
        &["index"]  // notificationsIdx, reactionsIdx, threadIdx, followsIdx
    ).expect("metric creation failed");

    /// Source failures that were swallowed, by index and reason
    pub static ref FEED_SOURCE_FAILURES: CounterVec = CounterVec::new(
        Opts::new("feed_source_failures_total", "Source reads that contributed nothing because they failed"),
        &["index", "reason"]  // reason: io/decode/unresolvable/not_found
    ).expect("metric creation failed");

    /// Wall time of one fan-out across all sources
    pub static ref FEED_FANOUT_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "feed_fanout_duration_seconds",
            "Time spent scanning every source of one request"
        ).buckets(vec![0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5])
    ).expect("metric creation failed");

    // =========================================================================
    // RESULT METRICS
    // =========================================================================

    /// Hydrated notifications returned to callers
    pub static ref FEED_NOTIFICATIONS_SERVED: Counter = Counter::new(
        "feed_notifications_served_total",
        "Hydrated notifications returned"
    ).expect("metric creation failed");

    /// Notifications dropped because their item origin did not resolve
    pub static ref FEED_HYDRATION_DROPS: Counter = Counter::new(
        "feed_hydration_drops_total",
        "Notifications dropped during hydration"
    ).expect("metric creation failed");

    /// Voter URLs that did not resolve to an owner
    pub static ref FEED_VOTERS_DROPPED: Counter = Counter::new(
        "feed_voters_dropped_total",
        "Reaction voters dropped because their address did not resolve"
    ).expect("metric creation failed");
}

/// Handle to the registry the feed metrics live in.
#[derive(Clone)]
pub struct MetricsHandle {
    registry: Arc<Registry>,
}

impl MetricsHandle {
    /// Encode all registered metrics as Prometheus text format.
    pub fn render(&self) -> Result<String, TelemetryError> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
        String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
    }
}

/// Register all metrics with the global registry.
///
/// Calling this more than once is harmless.
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        // Fan-out
        Box::new(FEED_SOURCES_QUERIED.clone()),
        Box::new(FEED_SOURCE_FAILURES.clone()),
        Box::new(FEED_FANOUT_DURATION.clone()),
        // Results
        Box::new(FEED_NOTIFICATIONS_SERVED.clone()),
        Box::new(FEED_HYDRATION_DROPS.clone()),
        Box::new(FEED_VOTERS_DROPPED.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }

    Ok(MetricsHandle {
        registry: Arc::new(REGISTRY.clone()),
    })
}

/// Timer guard for automatic histogram observation.
pub struct HistogramTimer {
    histogram: Histogram,
    start: std::time::Instant,
}

impl HistogramTimer {
    /// Start a new timer for the given histogram.
    pub fn new(histogram: &Histogram) -> Self {
        Self {
            histogram: histogram.clone(),
            start: std::time::Instant::now(),
        }
    }
}

impl Drop for HistogramTimer {
    fn drop(&mut self) {
        self.histogram.observe(self.start.elapsed().as_secs_f64());
    }
}
