//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the listwatch server:
//! - HTTP request metrics (latency, counts)
//! - Per-query available/visited counts (collected dynamically)
//! - Core fetch, poll and snapshot metrics (registered from `listwatch_core`)

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, IntGaugeVec, Opts,
    Registry, TextEncoder,
};
use tracing::error;

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "listwatch_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("listwatch_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "listwatch_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

// =============================================================================
// Query Metrics (collected dynamically)
// =============================================================================

/// Available hits per query.
pub static AVAILABLE_ITEMS: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new("listwatch_available_items", "Current available hits per query"),
        &["endpoint"],
    )
    .unwrap()
});

/// Visited hits per query.
pub static VISITED_ITEMS: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new("listwatch_visited_items", "Current visited hits per query"),
        &["endpoint"],
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    // HTTP
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();

    // Queries
    registry
        .register(Box::new(AVAILABLE_ITEMS.clone()))
        .unwrap();
    registry.register(Box::new(VISITED_ITEMS.clone())).unwrap();

    // Core metrics (fetcher, pollers, snapshots)
    for metric in listwatch_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Collect dynamic metrics from current application state.
///
/// This is called before encoding metrics to update gauges with the current
/// size of every query.
pub async fn collect_dynamic_metrics(state: &crate::state::AppState) {
    for summary in state.registry().summaries().await {
        AVAILABLE_ITEMS
            .with_label_values(&[&summary.endpoint])
            .set(summary.available as i64);
        VISITED_ITEMS
            .with_label_values(&[&summary.endpoint])
            .set(summary.visited as i64);
    }
}
