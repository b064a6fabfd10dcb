//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Fetcher (pages, retries, exhausted fetches)
//! - Pollers (refresh outcomes)
//! - Snapshot manager (writes and their duration)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Fetcher Metrics
// =============================================================================

/// Pages fetched successfully.
pub static PAGES_FETCHED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "listwatch_pages_fetched_total",
        "Total search pages fetched successfully",
    )
    .unwrap()
});

/// Page requests that failed and were retried.
pub static FETCH_RETRIES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("listwatch_fetch_retries_total", "Total page request retries"),
        &["reason"], // "transport", "status", "decode"
    )
    .unwrap()
});

/// Fetches abandoned after a page ran out of attempts.
pub static FETCH_EXHAUSTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "listwatch_fetch_exhausted_total",
        "Total fetches abandoned after exhausting page retries",
    )
    .unwrap()
});

/// Hits returned per complete fetch.
pub static HITS_PER_FETCH: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "listwatch_hits_per_fetch",
            "Number of hits returned by a complete paginated fetch",
        )
        .buckets(vec![0.0, 10.0, 50.0, 100.0, 500.0, 1000.0, 5000.0]),
        &[],
    )
    .unwrap()
});

// =============================================================================
// Poller Metrics
// =============================================================================

/// Poll cycles by result.
pub static POLLS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("listwatch_polls_total", "Total poll cycles"),
        &["result"], // "refreshed", "failed"
    )
    .unwrap()
});

// =============================================================================
// Snapshot Metrics
// =============================================================================

/// Snapshots by result.
pub static SNAPSHOTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("listwatch_snapshots_total", "Total snapshot attempts"),
        &["result"], // "success", "failed"
    )
    .unwrap()
});

/// Snapshot duration in seconds (lock, serialize, write).
pub static SNAPSHOT_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "listwatch_snapshot_duration_seconds",
            "Duration of a full registry snapshot",
        )
        .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
        &[],
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Fetcher
        Box::new(PAGES_FETCHED.clone()),
        Box::new(FETCH_RETRIES.clone()),
        Box::new(FETCH_EXHAUSTED.clone()),
        Box::new(HITS_PER_FETCH.clone()),
        // Pollers
        Box::new(POLLS_TOTAL.clone()),
        // Snapshots
        Box::new(SNAPSHOTS_TOTAL.clone()),
        Box::new(SNAPSHOT_DURATION.clone()),
    ]
}
