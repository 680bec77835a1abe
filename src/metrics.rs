//! Prometheus metrics for application observability.
//!
//! Metrics are exposed via a dedicated HTTP listener (default port 9090).
//! When the exporter is not installed (tests, `METRICS_PORT=0`) every
//! recording call is a cheap no-op.
//!
//! # Available Metrics
//!
//! ## Counters
//! - `gateway_cache_lookups_total` - Cache lookups (labels: namespace, result)
//! - `gateway_rate_limited_total` - Requests rejected by the rate limiter
//! - `gateway_upstream_fetches_total` - DB server fetches (labels: outcome)
//!
//! ## Histograms
//! - `gateway_request_duration_seconds` - Request duration (labels: method, status)
//! - `gateway_upstream_duration_seconds` - DB server fetch duration

use std::net::SocketAddr;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::info;

/// Metric names as constants for consistency.
pub mod names {
    pub const CACHE_LOOKUPS_TOTAL: &str = "gateway_cache_lookups_total";
    pub const RATE_LIMITED_TOTAL: &str = "gateway_rate_limited_total";
    pub const UPSTREAM_FETCHES_TOTAL: &str = "gateway_upstream_fetches_total";
    pub const REQUEST_DURATION_SECONDS: &str = "gateway_request_duration_seconds";
    pub const UPSTREAM_DURATION_SECONDS: &str = "gateway_upstream_duration_seconds";
}

/// Install the Prometheus exporter and describe all metrics.
///
/// # Errors
///
/// Returns a message if the exporter cannot bind `metrics_addr` or a
/// global recorder is already installed.
pub fn init_metrics(metrics_addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(metrics_addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {e}"))?;

    describe_counter!(
        names::CACHE_LOOKUPS_TOTAL,
        "Response cache lookups by result (hit/miss)"
    );
    describe_counter!(
        names::RATE_LIMITED_TOTAL,
        "Requests rejected because the caller exceeded the rate limit"
    );
    describe_counter!(
        names::UPSTREAM_FETCHES_TOTAL,
        "DB server fetches by outcome"
    );
    describe_histogram!(
        names::REQUEST_DURATION_SECONDS,
        "HTTP request duration in seconds"
    );
    describe_histogram!(
        names::UPSTREAM_DURATION_SECONDS,
        "DB server fetch duration in seconds"
    );

    info!(%metrics_addr, "Prometheus metrics exporter listening");
    Ok(())
}

/// Record the duration of a finished HTTP request.
pub fn record_request_duration(method: &str, status: u16, duration_secs: f64) {
    histogram!(
        names::REQUEST_DURATION_SECONDS,
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .record(duration_secs);
}

/// Record one request rejected by the rate limiter.
pub fn record_rate_limited() {
    counter!(names::RATE_LIMITED_TOTAL).increment(1);
}

/// Record one DB server fetch and how long it took.
pub fn record_upstream_fetch(outcome: &'static str, duration_secs: f64) {
    counter!(names::UPSTREAM_FETCHES_TOTAL, "outcome" => outcome).increment(1);
    histogram!(names::UPSTREAM_DURATION_SECONDS).record(duration_secs);
}
