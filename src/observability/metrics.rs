//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define rendering metrics (requests, latency, hydration, failures)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `soya_requests_total` (counter): requests by status, page
//! - `soya_request_duration_seconds` (histogram): dispatch latency
//! - `soya_hydration_duration_seconds` (histogram): hydration latency by outcome
//! - `soya_render_failures_total` (counter): failed renders by stage
//!
//! # Design Decisions
//! - Recording is a no-op until an exporter is installed
//! - Labels stay low-cardinality: page ids, not paths

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter with its own HTTP listener.
/// Must be called from within a tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(status: u16, page: &str, started: Instant) {
    ::metrics::counter!(
        "soya_requests_total",
        "status" => status.to_string(),
        "page" => page.to_string()
    )
    .increment(1);
    ::metrics::histogram!("soya_request_duration_seconds", "page" => page.to_string())
        .record(started.elapsed().as_secs_f64());
}

pub fn record_hydration(started: Instant, ok: bool) {
    let outcome = if ok { "ok" } else { "error" };
    ::metrics::histogram!("soya_hydration_duration_seconds", "outcome" => outcome)
        .record(started.elapsed().as_secs_f64());
}

pub fn record_render_failure(stage: &'static str) {
    ::metrics::counter!("soya_render_failures_total", "stage" => stage).increment(1);
}
