//! Metrics collection and exposition.
//!
//! # Metrics
//! - `relay_requests_total` (counter): inbound relay requests by status
//! - `relay_request_duration_seconds` (histogram): inbound latency
//! - `relay_rate_limited_total` (counter): requests rejected by the limiter
//! - `relay_rate_limit_windows` (gauge): tracked (client, bucket) windows
//! - `relay_upstream_attempts_total` (counter): attempts by endpoint, outcome
//! - `relay_upstream_attempt_duration_seconds` (histogram)
//!
//! Recording is a no-op until [`init_metrics`] installs the exporter.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(status: u16, start: Instant) {
    counter!("relay_requests_total", "status" => status.to_string()).increment(1);
    histogram!("relay_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_rate_limited() {
    counter!("relay_rate_limited_total").increment(1);
}

pub fn record_rate_limit_windows(count: usize) {
    gauge!("relay_rate_limit_windows").set(count as f64);
}

pub fn record_upstream_attempt(endpoint: &str, outcome: &'static str, start: Instant) {
    counter!(
        "relay_upstream_attempts_total",
        "endpoint" => endpoint.to_string(),
        "outcome" => outcome
    )
    .increment(1);
    histogram!("relay_upstream_attempt_duration_seconds", "endpoint" => endpoint.to_string())
        .record(start.elapsed().as_secs_f64());
}
