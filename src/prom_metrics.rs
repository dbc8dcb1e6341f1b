//! # Prometheus Metrics — Exposition for Scraping
//!
//! Exposes ledger operational metrics in the OpenMetrics text format.
//!
//! ## Metrics Exposed
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `piecework_http_request_duration_seconds` | Histogram | `method`, `path` | Request latency |
//! | `piecework_entries_recorded_total` | Counter | `pricing` | Production entries recorded, priced or unpriced |
//! | `piecework_rate_upserts_total` | Counter | - | Rate create/update calls |
//! | `piecework_aggregations_total` | Counter | `window` | Earnings aggregations run |
//! | `piecework_skipped_entries_total` | Counter | - | Entries dropped for unknown workers |
//! | `piecework_store_unavailable_total` | Counter | - | Requests failed with a transient store error |
//!
//! The `/metrics` endpoint renders the current registry state on each scrape.

use prometheus_client::encoding::text::encode;
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::histogram::{exponential_buckets, Histogram};
use prometheus_client::registry::Registry;

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct HttpLabel {
    pub method: String,
    pub path: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct PricingLabel {
    /// `priced` or `unpriced`.
    pub pricing: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct WindowLabel {
    pub window: String,
}

type HistogramCtor = fn() -> Histogram;

fn http_duration_histogram() -> Histogram {
    // 5ms .. ~10s
    Histogram::new(exponential_buckets(0.005, 2.0, 12))
}

/// Thread-safe metrics registry. All fields are atomics and can be updated
/// from any task.
pub struct Metrics {
    pub registry: Registry,
    pub http_request_duration: Family<HttpLabel, Histogram, HistogramCtor>,
    pub entries_recorded: Family<PricingLabel, Counter>,
    pub rate_upserts: Counter,
    pub aggregations: Family<WindowLabel, Counter>,
    pub skipped_entries: Counter,
    pub store_unavailable: Counter,
}

impl Metrics {
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let http_request_duration =
            Family::<HttpLabel, Histogram, HistogramCtor>::new_with_constructor(
                http_duration_histogram,
            );
        registry.register(
            "piecework_http_request_duration_seconds",
            "HTTP request duration by method and normalized path",
            http_request_duration.clone(),
        );

        let entries_recorded = Family::<PricingLabel, Counter>::default();
        registry.register(
            "piecework_entries_recorded",
            "Production entries recorded, by whether their category has a rate",
            entries_recorded.clone(),
        );

        let rate_upserts = Counter::default();
        registry.register(
            "piecework_rate_upserts",
            "Rate create or update calls",
            rate_upserts.clone(),
        );

        let aggregations = Family::<WindowLabel, Counter>::default();
        registry.register(
            "piecework_aggregations",
            "Earnings aggregations by window",
            aggregations.clone(),
        );

        let skipped_entries = Counter::default();
        registry.register(
            "piecework_skipped_entries",
            "Entries skipped during aggregation because their worker no longer exists",
            skipped_entries.clone(),
        );

        let store_unavailable = Counter::default();
        registry.register(
            "piecework_store_unavailable",
            "Requests that failed with a transient store error",
            store_unavailable.clone(),
        );

        Self {
            registry,
            http_request_duration,
            entries_recorded,
            rate_upserts,
            aggregations,
            skipped_entries,
            store_unavailable,
        }
    }

    pub fn observe_entry(&self, priced: bool) {
        let pricing = if priced { "priced" } else { "unpriced" };
        self.entries_recorded
            .get_or_create(&PricingLabel {
                pricing: pricing.to_string(),
            })
            .inc();
    }

    /// Count one aggregation and the entries it had to skip.
    pub fn observe_aggregation(&self, window: &str, skipped: usize) {
        self.aggregations
            .get_or_create(&WindowLabel {
                window: window.to_string(),
            })
            .inc();
        self.skipped_entries.inc_by(skipped as u64);
    }

    /// Render all metrics in text exposition format.
    pub fn encode(&self) -> String {
        let mut buf = String::new();
        if let Err(e) = encode(&mut buf, &self.registry) {
            tracing::warn!(error = %e, "failed to encode metrics");
        }
        buf
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
