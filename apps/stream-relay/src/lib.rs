#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::default_trait_access,
        clippy::items_after_statements
    )
)]

//! Polygon Stream Relay - Market Data Ingestion Worker
//!
//! A worker service that maintains a single connection to Polygon's
//! WebSocket feed, normalizes trades, quotes and minute bars for a fixed
//! watchlist, and republishes them to Redis pub/sub channels for
//! downstream consumers.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: Core data types
//!   - `streaming`: Normalized market data messages (trades, quotes, bars)
//!   - `watchlist`: Symbol watchlist parsing
//!
//! - **Application**: Port definitions and services
//!   - `ports`: The publish sink interface
//!   - `services`: Shared counters, periodic health monitoring
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `polygon`: WebSocket client for the upstream feed
//!   - `redis_sink`: Redis pub/sub publisher
//!   - `config`: Environment-based configuration
//!   - `health`: Health check HTTP endpoint
//!
//! # Data Flow
//!
//! ```text
//! Polygon WS ──► codec ──► classify ──► Redis pub/sub ──► marketdata.AAPL
//!                                                     ──► marketdata.MSFT
//!                                                     ──► marketdata.<SYM>
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Core data types with no external dependencies.
pub mod domain;

/// Application layer - Port definitions and services.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::streaming::{BarData, QuoteData, StreamMessage, StreamPayload, TradeData};
pub use domain::watchlist::Watchlist;

// Application ports and services
pub use application::ports::MessageSink;
pub use application::services::counters::{CountersSnapshot, WorkerCounters};
pub use application::services::health::{HealthMonitor, HealthMonitorConfig};

// Infrastructure config
pub use infrastructure::config::{ApiKey, ConfigError, RelayConfig};

// Feed client (for integration tests)
pub use infrastructure::polygon::{
    BackoffConfig, FeedClient, FeedClientConfig, FeedError, FeedSession, ReconnectPolicy,
};

// Redis sink
pub use infrastructure::redis_sink::{RedisSink, RedisSinkError};

// Health server
pub use infrastructure::health::{HealthServer, HealthServerError};

// Metrics
pub use infrastructure::metrics::init_metrics;

// Telemetry
pub use infrastructure::telemetry::init as init_telemetry;
