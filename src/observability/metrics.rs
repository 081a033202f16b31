//! Metrics collection and exposition.
//!
//! # Metrics
//! - `edge_requests_total` (counter): requests by outcome, status
//! - `edge_request_duration_seconds` (histogram): latency by outcome
//! - `edge_region_refresh_total` (counter): region reloads by outcome
//! - `edge_region_cache_countries` (gauge): countries in the live snapshot
//! - `edge_upstream_requests_total` (counter): forwarded requests by upstream, status
//! - `edge_upstream_duration_seconds` (histogram): upstream latency
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// Record a request handled by the edge.
pub fn record_request(outcome: &'static str, status: u16, start: Instant) {
    counter!("edge_requests_total", "outcome" => outcome, "status" => status.to_string())
        .increment(1);
    histogram!("edge_request_duration_seconds", "outcome" => outcome)
        .record(start.elapsed().as_secs_f64());
}

/// Record a region cache reload.
pub fn record_region_refresh(outcome: &'static str, countries: usize) {
    counter!("edge_region_refresh_total", "outcome" => outcome).increment(1);
    gauge!("edge_region_cache_countries").set(countries as f64);
}

/// Record a forwarded request.
pub fn record_upstream(upstream: &'static str, status: u16, start: Instant) {
    counter!("edge_upstream_requests_total", "upstream" => upstream, "status" => status.to_string())
        .increment(1);
    histogram!("edge_upstream_duration_seconds", "upstream" => upstream)
        .record(start.elapsed().as_secs_f64());
}
