//! Metrics collection and exposition.
//!
//! # Metrics
//! - `capability_actions_total` (counter): start/stop attempts by capability, action, outcome
//! - `capability_state` (gauge): 0=stopped, 1=starting, 2=running, 3=stopping
//! - `config_reloads_total` (counter): file reloads by outcome
//!
//! # Design Decisions
//! - Recording is a no-op until an exporter is installed
//! - Prometheus exporter is optional and off by default

use std::net::SocketAddr;
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_capability_action(capability: &'static str, action: &'static str, ok: bool) {
    let outcome = if ok { "ok" } else { "error" };
    metrics::counter!(
        "capability_actions_total",
        "capability" => capability,
        "action" => action,
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_capability_state(capability: &'static str, state: u8) {
    metrics::gauge!("capability_state", "capability" => capability).set(state as f64);
}

pub fn record_config_reload(outcome: &'static str) {
    metrics::counter!("config_reloads_total", "outcome" => outcome).increment(1);
}
