//! Metrics collection and exposition.
//!
//! # Metrics
//! - `rpc_calls_total` (counter): remote calls by function and status
//! - `rpc_call_duration_seconds` (histogram): decode + invoke + encode time
//! - `mux_requests_total` (counter): dispatch outcome (`route`,
//!   `middleware`, `not_found`)
//! - `http_connections_active` (gauge): live connections
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every update is a no-op
//! - The Prometheus exporter is opt-in from the binary

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and serve `/metrics` on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint started");
    Ok(())
}

/// Record one finished remote call. `function` must come from a bounded
/// set; the dispatcher folds unregistered names into one label.
pub fn record_call(function: &str, status: u16, start: Instant) {
    let function = function.to_string();
    metrics::counter!(
        "rpc_calls_total",
        "function" => function.clone(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("rpc_call_duration_seconds", "function" => function)
        .record(start.elapsed().as_secs_f64());
}

/// Update the live connection gauge.
pub fn set_active_connections(count: u64) {
    metrics::gauge!("http_connections_active").set(count as f64);
}
