//! Health Check and Metrics Endpoint
//!
//! HTTP endpoint for health checks, feed status reporting, and Prometheus
//! metrics. Used by container orchestrators and monitoring systems.
//!
//! # Endpoints
//!
//! - `GET /health` - Returns JSON health status
//! - `GET /healthz` - Kubernetes liveness probe (simple OK)
//! - `GET /readyz` - Kubernetes readiness probe (checks the feed)
//! - `GET /metrics` - Prometheus metrics in text format

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::get};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::application::services::counters::{CountersSnapshot, WorkerCounters};
use crate::infrastructure::metrics::get_metrics_handle;

// =============================================================================
// Health Response Types
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Overall status: "healthy", "degraded", or "unhealthy".
    pub status: HealthStatus,
    /// Worker version.
    pub version: String,
    /// Worker uptime in seconds.
    pub uptime_secs: u64,
    /// Current time.
    pub current_time: DateTime<Utc>,
    /// Upstream feed status.
    pub feed: FeedInfo,
}

/// Overall health status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Connected and authenticated.
    Healthy,
    /// Socket open but not authenticated.
    Degraded,
    /// No upstream connection.
    Unhealthy,
}

/// Upstream feed status.
#[derive(Debug, Clone, Serialize)]
pub struct FeedInfo {
    /// Whether the upstream socket is open.
    pub connected: bool,
    /// Whether the session is authenticated.
    pub authenticated: bool,
    /// Symbols covered by the active subscription.
    pub subscribed_symbols: usize,
    /// Total data frames received.
    pub messages_received: u64,
    /// Seconds since the last data frame, if any arrived.
    pub seconds_since_last_message: Option<u64>,
    /// Consecutive reconnect attempts (0 after a successful handshake).
    pub reconnect_attempts: u32,
    /// Messages dropped because a publish failed.
    pub publish_failures: u64,
}

// =============================================================================
// Health Server
// =============================================================================

/// Health check HTTP server.
pub struct HealthServer {
    port: u16,
    counters: Arc<WorkerCounters>,
    cancel: CancellationToken,
}

impl HealthServer {
    /// Create a new health server.
    #[must_use]
    pub const fn new(port: u16, counters: Arc<WorkerCounters>, cancel: CancellationToken) -> Self {
        Self {
            port,
            counters,
            cancel,
        }
    }

    /// Run the health server until cancelled.
    ///
    /// # Errors
    ///
    /// Returns `HealthServerError` if binding fails or the HTTP server
    /// encounters a fatal error while running.
    pub async fn run(self) -> Result<(), HealthServerError> {
        let app = Router::new()
            .route("/health", get(health_handler))
            .route("/healthz", get(liveness_handler))
            .route("/readyz", get(readiness_handler))
            .route("/metrics", get(metrics_handler))
            .with_state(self.counters);

        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| HealthServerError::BindFailed(self.port, e.to_string()))?;

        tracing::info!(port = self.port, "health server listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(self.cancel.cancelled_owned())
            .await
            .map_err(|e| HealthServerError::ServerFailed(e.to_string()))?;

        tracing::info!("health server stopped");
        Ok(())
    }
}

// =============================================================================
// HTTP Handlers
// =============================================================================

async fn health_handler(State(counters): State<Arc<WorkerCounters>>) -> impl IntoResponse {
    let response = build_health_response(&counters.snapshot());
    let status_code = match response.status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status_code, Json(response))
}

async fn liveness_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

async fn readiness_handler(State(counters): State<Arc<WorkerCounters>>) -> impl IntoResponse {
    if counters.is_connected() {
        (StatusCode::OK, "READY")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "NOT READY")
    }
}

async fn metrics_handler() -> impl IntoResponse {
    get_metrics_handle().map_or_else(
        || {
            (
                StatusCode::SERVICE_UNAVAILABLE,
                [("content-type", "text/plain")],
                "Metrics not initialized".to_string(),
            )
        },
        |handle| {
            let body = handle.render();
            (
                StatusCode::OK,
                [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
                body,
            )
        },
    )
}

fn build_health_response(snapshot: &CountersSnapshot) -> HealthResponse {
    let status = determine_health_status(snapshot);

    HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: snapshot.uptime.as_secs(),
        current_time: Utc::now(),
        feed: FeedInfo {
            connected: snapshot.is_connected,
            authenticated: snapshot.is_authenticated,
            subscribed_symbols: snapshot.subscribed_symbols,
            messages_received: snapshot.message_count,
            seconds_since_last_message: snapshot
                .time_since_last_message
                .map(|d| d.as_secs()),
            reconnect_attempts: snapshot.reconnect_attempts,
            publish_failures: snapshot.publish_failures,
        },
    }
}

const fn determine_health_status(snapshot: &CountersSnapshot) -> HealthStatus {
    if snapshot.is_connected && snapshot.is_authenticated {
        HealthStatus::Healthy
    } else if snapshot.is_connected {
        HealthStatus::Degraded
    } else {
        HealthStatus::Unhealthy
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Health server errors.
#[derive(Debug, thiserror::Error)]
pub enum HealthServerError {
    /// Failed to bind to port.
    #[error("failed to bind to port {0}: {1}")]
    BindFailed(u16, String),

    /// Server error.
    #[error("server error: {0}")]
    ServerFailed(String),
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(connected: bool, authenticated: bool) -> CountersSnapshot {
        let counters = WorkerCounters::new();
        counters.set_connected(connected);
        counters.set_authenticated(authenticated);
        counters.snapshot()
    }

    #[test]
    fn health_status_serialization() {
        assert_eq!(
            serde_json::to_string(&HealthStatus::Healthy).unwrap(),
            "\"healthy\""
        );
        assert_eq!(
            serde_json::to_string(&HealthStatus::Degraded).unwrap(),
            "\"degraded\""
        );
        assert_eq!(
            serde_json::to_string(&HealthStatus::Unhealthy).unwrap(),
            "\"unhealthy\""
        );
    }

    #[test]
    fn authenticated_feed_is_healthy() {
        assert_eq!(
            determine_health_status(&snapshot(true, true)),
            HealthStatus::Healthy
        );
    }

    #[test]
    fn connected_but_unauthenticated_is_degraded() {
        assert_eq!(
            determine_health_status(&snapshot(true, false)),
            HealthStatus::Degraded
        );
    }

    #[test]
    fn disconnected_is_unhealthy() {
        assert_eq!(
            determine_health_status(&snapshot(false, false)),
            HealthStatus::Unhealthy
        );
    }
}
