//! Metrics collection for directory-service.
//!
//! HTTP request metrics come from the shared middleware; this module adds
//! workflow counters and owns the Prometheus recorder.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder. Safe to call more than once.
pub fn init_metrics() {
    if METRICS_HANDLE.get().is_some() {
        return;
    }

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            let _ = METRICS_HANDLE.set(handle);
        }
        Err(e) => {
            tracing::error!("Failed to install Prometheus recorder: {}", e);
        }
    }
}

/// Get metrics output in Prometheus text format.
pub fn get_metrics() -> String {
    METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized\n".to_string())
}

/// Count an access request reaching `status`.
pub fn record_transition(status: &'static str) {
    metrics::counter!("access_request_transitions_total", "status" => status).increment(1);
}

/// Count a request status write that failed after the irreversible step
/// (provisioning or verification) already happened.
pub fn record_bookkeeping_failure(step: &'static str) {
    metrics::counter!("access_request_bookkeeping_failures_total", "step" => step).increment(1);
}

/// Count a notification attempt by template and outcome.
pub fn record_notification(kind: &'static str, outcome: &'static str) {
    metrics::counter!(
        "notifications_total",
        "kind" => kind,
        "outcome" => outcome
    )
    .increment(1);
}
