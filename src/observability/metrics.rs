//! Metrics collection and exposition.
//!
//! # Metrics
//! - `fib_compute_total` (counter): compute calls by outcome
//! - `fib_compute_duration_seconds` (histogram): evaluator latency
//! - `fib_cache_lookups_total` (counter): cache lookups by result
//! - `telemetry_reports_total` (counter): reports by outcome
//! - `telemetry_attempts_total` (counter): delivery attempts
//! - `stats_records_total` (counter): observations merged by the aggregator
//! - `rpc_requests_total` (counter): RPCs served by method and code
//!
//! All helpers are no-ops until a recorder is installed.

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Duration;

/// Install the Prometheus recorder and its scrape endpoint.
///
/// Must run inside a Tokio runtime. Failure is logged, not fatal.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => {
            describe_metrics();
            tracing::info!(address = %addr, "Metrics endpoint listening");
        }
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics recorder"),
    }
}

fn describe_metrics() {
    ::metrics::describe_counter!("fib_compute_total", "Compute calls by outcome");
    ::metrics::describe_histogram!(
        "fib_compute_duration_seconds",
        ::metrics::Unit::Seconds,
        "Time spent evaluating Fib(n)"
    );
    ::metrics::describe_counter!("fib_cache_lookups_total", "Cache lookups by result");
    ::metrics::describe_counter!("telemetry_reports_total", "Observation reports by outcome");
    ::metrics::describe_counter!("telemetry_attempts_total", "Observation delivery attempts");
    ::metrics::describe_counter!("stats_records_total", "Observations merged into stats");
    ::metrics::describe_counter!("rpc_requests_total", "RPCs served by method and code");
}

pub fn record_compute(elapsed: Duration) {
    ::metrics::counter!("fib_compute_total", "outcome" => "ok").increment(1);
    ::metrics::histogram!("fib_compute_duration_seconds").record(elapsed.as_secs_f64());
}

pub fn record_compute_rejected() {
    ::metrics::counter!("fib_compute_total", "outcome" => "invalid_argument").increment(1);
}

pub fn record_cache_lookup(result: &'static str) {
    ::metrics::counter!("fib_cache_lookups_total", "result" => result).increment(1);
}

pub fn record_report(outcome: &'static str) {
    ::metrics::counter!("telemetry_reports_total", "outcome" => outcome).increment(1);
}

pub fn record_report_attempt() {
    ::metrics::counter!("telemetry_attempts_total").increment(1);
}

pub fn record_stats_record() {
    ::metrics::counter!("stats_records_total").increment(1);
}

pub fn record_rpc(method: &'static str, code: &'static str) {
    ::metrics::counter!("rpc_requests_total", "method" => method, "code" => code).increment(1);
}
