//! Configuration Module
//!
//! Configuration loading and validation for the relay worker.

mod settings;

pub use settings::{
    ApiKey, ConfigError, HealthSettings, RelayConfig, WebSocketSettings, DEFAULT_CHANNEL_PREFIX,
    DEFAULT_FEED_URL, DEFAULT_WATCHLIST,
};
