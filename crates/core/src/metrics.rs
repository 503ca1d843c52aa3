//! Prometheus metrics for conversions.
//!
//! This module provides metrics for:
//! - Conversions (outcomes, duration)
//! - Tracks (resolved actions)
//! - Pipelines (frames decoded and encoded, bytes written)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Conversion Metrics
// =============================================================================

/// Conversions total by result.
pub static CONVERSIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("webconvert_conversions_total", "Total conversions"),
        &["result"], // "success", "validation", "aborted_by_caller", "codec", ...
    )
    .unwrap()
});

/// Conversion duration in seconds.
pub static CONVERSION_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "webconvert_conversion_duration_seconds",
            "Duration of conversions",
        )
        .buckets(vec![0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0, 300.0, 900.0, 1800.0]),
        &["result"],
    )
    .unwrap()
});

// =============================================================================
// Track Metrics
// =============================================================================

/// Track actions by kind and action.
pub static TRACK_ACTIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("webconvert_track_actions_total", "Actions resolved per track"),
        &["kind", "action"], // kind: "video", "audio"; action: "reencode", "passthrough", "drop"
    )
    .unwrap()
});

// =============================================================================
// Pipeline Metrics
// =============================================================================

/// Frames processed by kind and stage.
pub static FRAMES_PROCESSED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "webconvert_frames_processed_total",
            "Frames decoded and chunks encoded",
        ),
        &["kind", "stage"], // stage: "decoded", "encoded"
    )
    .unwrap()
});

/// Output bytes written.
pub static BYTES_WRITTEN: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "webconvert_bytes_written_total",
        "Total bytes accepted by output writers",
    )
    .unwrap()
});

/// Returns all metrics for registration.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(CONVERSIONS_TOTAL.clone()),
        Box::new(CONVERSION_DURATION.clone()),
        Box::new(TRACK_ACTIONS.clone()),
        Box::new(FRAMES_PROCESSED.clone()),
        Box::new(BYTES_WRITTEN.clone()),
    ]
}
