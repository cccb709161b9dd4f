//! Prometheus metrics registry and instruments.
//!
//! This module is framework-agnostic and can be used from any layer.

use lazy_static::lazy_static;
use prometheus::{HistogramOpts, IntCounter, IntCounterVec, Opts, Registry};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // Data API Metrics
    pub static ref API_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("autolote_api_requests_total", "Total number of data API requests"),
        &["method", "resource", "status"]
    ).expect("metric can be created");
    pub static ref API_REQUEST_DURATION_SECONDS: prometheus::HistogramVec = prometheus::HistogramVec::new(
        HistogramOpts::new(
            "autolote_api_request_duration_seconds",
            "Data API request duration in seconds"
        ).buckets(vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        &["method", "resource"]
    ).expect("metric can be created");

    // Browse Metrics
    pub static ref STALE_RESPONSES_TOTAL: IntCounter = IntCounter::new(
        "autolote_stale_responses_total",
        "Listing responses discarded because a newer query was issued"
    ).expect("metric can be created");

    // Error Metrics
    pub static ref ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("autolote_errors_total", "Total number of errors surfaced to the user"),
        &["error_type", "operation"]
    ).expect("metric can be created");
}

/// Initialize metrics registry.
pub fn init_metrics() {
    REGISTRY
        .register(Box::new(API_REQUESTS_TOTAL.clone()))
        .expect("API_REQUESTS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(API_REQUEST_DURATION_SECONDS.clone()))
        .expect("API_REQUEST_DURATION_SECONDS can be registered");
    REGISTRY
        .register(Box::new(STALE_RESPONSES_TOTAL.clone()))
        .expect("STALE_RESPONSES_TOTAL can be registered");
    REGISTRY
        .register(Box::new(ERRORS_TOTAL.clone()))
        .expect("ERRORS_TOTAL can be registered");

    tracing::info!("Metrics registry initialized");
}

/// Render every registered metric in Prometheus text format.
///
/// Counters live in process memory, so the output covers only what this
/// process has recorded since `init_metrics`.
pub fn render_metrics() -> Result<String, crate::error::AppError> {
    use prometheus::{Encoder, TextEncoder};

    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| crate::error::AppError::Internal(e.into()))?;
    String::from_utf8(buffer).map_err(|e| crate::error::AppError::Internal(e.into()))
}
