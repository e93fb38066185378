//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): edge requests by method, status
//! - `proxy_request_duration_seconds` (histogram): edge latency
//! - `proxy_invocations_total` (counter): function invocations by outcome
//! - `function_requests_total` (counter): signing handler runs by outcome
//! - `parameter_cache_total` (counter): cache lookups by result (hit, miss)
//! - `parameter_cache_size` (gauge): hosts with cached parameters
//! - `parameter_store_queries_total` (counter): store pages fetched by outcome
//! - `parameter_not_found_total` (counter): resolutions with no entries
//!
//! # Design Decisions
//! - Without an installed recorder every update is a no-op
//! - Labels are low cardinality; hosts are never used as label values

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    counter!(
        "proxy_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("proxy_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

/// `outcome` is one of `ok`, `function_error`, `transport_error`, `malformed`, `timeout`.
pub fn record_invocation(outcome: &'static str) {
    counter!("proxy_invocations_total", "outcome" => outcome).increment(1);
}

pub fn record_function_request(outcome: &'static str) {
    counter!("function_requests_total", "outcome" => outcome).increment(1);
}

pub fn record_cache_lookup(hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    counter!("parameter_cache_total", "result" => result).increment(1);
}

pub fn record_cache_size(size: usize) {
    gauge!("parameter_cache_size").set(size as f64);
}

pub fn record_store_query(outcome: &'static str) {
    counter!("parameter_store_queries_total", "outcome" => outcome).increment(1);
}

pub fn record_parameters_not_found() {
    counter!("parameter_not_found_total").increment(1);
}
