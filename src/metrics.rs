//! Prometheus metrics for gate decisions.
//!
//! Metrics are exposed via a dedicated HTTP listener (default port 9090,
//! `METRICS_PORT=0` disables the exporter entirely; the recording macros
//! become no-ops when no exporter is installed).
//!
//! # Available Metrics
//!
//! - `apiguard_auth_failures_total` - Authentication rejections
//!   (label: `reason` = invalid_api_key | bearer_not_configured | missing_credentials)
//! - `apiguard_rate_limited_total` - Requests rejected by the rate limiter
//!   (label: `scope` = global | route)

use std::net::SocketAddr;

use metrics::{counter, describe_counter};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::info;

/// Metric names as constants for consistency.
pub mod names {
    pub const AUTH_FAILURES_TOTAL: &str = "apiguard_auth_failures_total";
    pub const RATE_LIMITED_TOTAL: &str = "apiguard_rate_limited_total";
}

/// Initialize the Prometheus metrics exporter.
///
/// Starts the HTTP listener on `metrics_addr` and registers metric
/// descriptions. Call once at startup.
pub fn init_metrics(metrics_addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(metrics_addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {e}"))?;

    describe_counter!(
        names::AUTH_FAILURES_TOTAL,
        "Total requests rejected by the authenticator"
    );
    describe_counter!(
        names::RATE_LIMITED_TOTAL,
        "Total requests rejected by the rate limiter"
    );

    info!(addr = %metrics_addr, "Prometheus metrics exporter listening");
    Ok(())
}

/// Record an authentication rejection.
pub fn record_auth_failure(reason: &'static str) {
    counter!(names::AUTH_FAILURES_TOTAL, "reason" => reason).increment(1);
}

/// Record a rate-limited request.
pub fn record_rate_limited(scope: &str) {
    counter!(names::RATE_LIMITED_TOTAL, "scope" => scope.to_string()).increment(1);
}
