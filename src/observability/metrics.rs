//! Metrics collection and exposition.
//!
//! # Metrics
//! - `dexmail_requests_total` (counter): requests by method, route, status
//! - `dexmail_request_duration_seconds` (histogram): latency distribution
//! - `dexmail_chain_calls_total` (counter): contract calls by name and outcome
//! - `dexmail_ipfs_fetch_total` (counter): gateway reads by outcome
//! - `dexmail_claims_total` (counter): claim lifecycle events
//! - `dexmail_rate_limited_total` (counter): rejected requests
//! - `dexmail_store_size` (gauge): entries per persisted store

use std::net::SocketAddr;
use std::time::Instant;
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter on its own listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// Record a finished HTTP request.
pub fn record_request(method: &str, route: &str, status: u16, start: Instant) {
    let labels = [
        ("method", method.to_string()),
        ("route", route.to_string()),
        ("status", status.to_string()),
    ];
    metrics::counter!("dexmail_requests_total", &labels).increment(1);
    metrics::histogram!("dexmail_request_duration_seconds", &labels)
        .record(start.elapsed().as_secs_f64());
}

/// Record a contract call outcome.
pub fn record_chain_call(call: &'static str, ok: bool) {
    let outcome = if ok { "ok" } else { "error" };
    metrics::counter!("dexmail_chain_calls_total", "call" => call, "outcome" => outcome)
        .increment(1);
}

/// Record an IPFS gateway read outcome ("hit", "missing", "error").
pub fn record_ipfs_fetch(outcome: &'static str) {
    metrics::counter!("dexmail_ipfs_fetch_total", "outcome" => outcome).increment(1);
}

/// Record a claim lifecycle event ("created", "verified", "claimed", "rejected").
pub fn record_claim_event(event: &'static str) {
    metrics::counter!("dexmail_claims_total", "event" => event).increment(1);
}

/// Record a request rejected by the rate limiter.
pub fn record_rate_limited(reason: &'static str) {
    metrics::counter!("dexmail_rate_limited_total", "reason" => reason).increment(1);
}

/// Record the number of entries in a persisted store.
pub fn record_store_size(store: &'static str, size: usize) {
    metrics::gauge!("dexmail_store_size", "store" => store).set(size as f64);
}
