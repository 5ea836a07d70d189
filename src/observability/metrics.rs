//! Metrics collection and exposition.
//!
//! # Metrics
//! - `chat_proxy_requests_total` (counter): requests by outcome, status
//! - `chat_proxy_request_duration_seconds` (histogram): latency by outcome
//! - `chat_proxy_dropped_attachments_total` (counter): silent drops by kind
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(outcome: &'static str, status: u16, start: Instant) {
    metrics::counter!(
        "chat_proxy_requests_total",
        "outcome" => outcome,
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("chat_proxy_request_duration_seconds", "outcome" => outcome)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_dropped_attachment(kind: &'static str) {
    metrics::counter!("chat_proxy_dropped_attachments_total", "kind" => kind).increment(1);
}
