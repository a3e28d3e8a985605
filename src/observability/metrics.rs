//! Metrics collection and exposition.
//!
//! # Metrics
//! - `chain_responses_total` (counter): responses by method and status
//! - `chain_request_duration_seconds` (histogram): chain run time by method
//! - `chain_handler_errors_total` (counter): requests that ended with a handler error
//!
//! # Design Decisions
//! - Recording is a no-op until `init_metrics` installs the Prometheus recorder
//! - Labels stay low-cardinality: no paths, no request IDs

use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder};
use std::net::SocketAddr;
use std::time::Duration;

const RESPONSES_TOTAL: &str = "chain_responses_total";
const REQUEST_DURATION: &str = "chain_request_duration_seconds";
const HANDLER_ERRORS_TOTAL: &str = "chain_handler_errors_total";

/// Install the Prometheus recorder and serve `/metrics` on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets_for_metric(
            Matcher::Suffix("duration_seconds".to_string()),
            &[0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0],
        )?
        .install()?;

    describe_counter!(RESPONSES_TOTAL, "Responses written, by method and status");
    describe_histogram!(REQUEST_DURATION, "Handler chain run time in seconds");
    describe_counter!(HANDLER_ERRORS_TOTAL, "Requests whose chain recorded an error");

    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record one resolved response.
pub fn record_response(method: &str, status: u16, elapsed: Duration) {
    metrics::counter!(
        RESPONSES_TOTAL,
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!(REQUEST_DURATION, "method" => method.to_string())
        .record(elapsed.as_secs_f64());
}

/// Record a chain that finished with at least one handler error.
pub fn record_handler_error(kind: &'static str) {
    metrics::counter!(HANDLER_ERRORS_TOTAL, "kind" => kind).increment(1);
}
