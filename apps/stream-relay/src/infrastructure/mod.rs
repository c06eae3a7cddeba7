//! Infrastructure Layer - Adapters and external integrations.
//!
//! This layer contains the concrete implementations of the port interfaces
//! defined in the application layer.

/// Polygon WebSocket client adapter.
pub mod polygon;

/// Redis pub/sub publish adapter.
pub mod redis_sink;

/// Configuration loading and validation.
pub mod config;

/// Health check HTTP endpoint.
pub mod health;

/// Prometheus metrics instrumentation.
pub mod metrics;

/// Tracing initialization.
pub mod telemetry;
