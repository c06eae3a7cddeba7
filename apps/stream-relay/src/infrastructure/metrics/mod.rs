//! Prometheus Metrics Module
//!
//! Exposes worker metrics via Prometheus format for monitoring.
//!
//! # Metrics Categories
//!
//! - **Messages**: Normalized messages by kind, dropped publishes
//! - **Connections**: Reconnection attempts
//!
//! # Integration
//!
//! Metrics are exposed at `/metrics` on the health server port.

use std::sync::OnceLock;

use metrics::{counter, describe_counter};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the Prometheus metrics recorder.
///
/// # Panics
///
/// Panics if the recorder cannot be installed.
#[allow(clippy::expect_used)]
pub fn init_metrics() -> PrometheusHandle {
    PROMETHEUS_HANDLE
        .get_or_init(|| {
            let builder = PrometheusBuilder::new();
            let handle = builder
                .install_recorder()
                .expect("failed to install Prometheus recorder");

            register_metrics();
            handle
        })
        .clone()
}

/// Get the Prometheus handle for rendering metrics.
///
/// Returns `None` if metrics have not been initialized.
#[must_use]
pub fn get_metrics_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

fn register_metrics() {
    describe_counter!(
        "relay_messages_total",
        "Total normalized messages received from the upstream feed"
    );
    describe_counter!(
        "relay_publish_failures_total",
        "Total messages dropped because a broker publish failed"
    );
    describe_counter!(
        "relay_reconnects_total",
        "Total upstream reconnection attempts"
    );
}

/// Record a normalized message by kind ("trade", "quote", "bar").
pub fn record_message(kind: &'static str) {
    counter!("relay_messages_total", "kind" => kind).increment(1);
}

/// Record a dropped message after a failed publish.
pub fn record_publish_failure() {
    counter!("relay_publish_failures_total").increment(1);
}

/// Record an upstream reconnection attempt.
pub fn record_reconnect() {
    counter!("relay_reconnects_total").increment(1);
}
