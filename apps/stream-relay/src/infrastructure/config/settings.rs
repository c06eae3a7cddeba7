//! Relay Configuration Settings
//!
//! Configuration types for the stream relay, loaded from environment
//! variables. Validation runs before any network connection is opened
//! so a misconfigured worker fails fast.

use std::time::Duration;

use crate::domain::watchlist::Watchlist;

/// Default upstream WebSocket URL (Polygon stocks cluster).
pub const DEFAULT_FEED_URL: &str = "wss://socket.polygon.io/stocks";

/// Default watchlist when `WATCHLIST` is unset.
pub const DEFAULT_WATCHLIST: &str = "AAPL,MSFT,GOOGL,AMZN,NVDA,META,TSLA,SPY,QQQ,AMD";

/// Default pub/sub channel prefix.
pub const DEFAULT_CHANNEL_PREFIX: &str = "marketdata";

/// Polygon API key.
#[derive(Clone)]
pub struct ApiKey(String);

impl ApiKey {
    /// Wrap a raw key.
    #[must_use]
    pub const fn new(key: String) -> Self {
        Self(key)
    }

    /// Get the raw key for the auth request.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ApiKey").field(&"[REDACTED]").finish()
    }
}

/// WebSocket reconnection settings.
#[derive(Debug, Clone)]
pub struct WebSocketSettings {
    /// Initial reconnection delay.
    pub reconnect_delay_initial: Duration,
    /// Maximum reconnection delay.
    pub reconnect_delay_max: Duration,
    /// Maximum consecutive reconnection attempts before giving up.
    pub max_reconnect_attempts: u32,
}

impl Default for WebSocketSettings {
    fn default() -> Self {
        Self {
            reconnect_delay_initial: Duration::from_millis(1000),
            reconnect_delay_max: Duration::from_secs(60),
            max_reconnect_attempts: 10,
        }
    }
}

/// Periodic health reporting settings.
#[derive(Debug, Clone)]
pub struct HealthSettings {
    /// Interval between status log lines.
    pub check_interval: Duration,
    /// Idle window after which a connected feed is reported stale.
    pub staleness_window: Duration,
    /// HTTP port for health and metrics endpoints.
    pub port: u16,
}

impl Default for HealthSettings {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(60),
            staleness_window: Duration::from_secs(300),
            port: 8080,
        }
    }
}

/// Complete relay configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Upstream WebSocket URL.
    pub feed_url: String,
    /// Polygon API key.
    pub api_key: ApiKey,
    /// Redis connection URL.
    pub redis_url: String,
    /// Symbols to subscribe to.
    pub watchlist: Watchlist,
    /// Pub/sub channel prefix.
    pub channel_prefix: String,
    /// Enable debug-level logging.
    pub debug: bool,
    /// WebSocket reconnection settings.
    pub websocket: WebSocketSettings,
    /// Health reporting settings.
    pub health: HealthSettings,
}

impl RelayConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a required environment variable is missing
    /// or empty, or if the watchlist contains no valid symbols.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = require_env("POLYGON_API_KEY")?;
        let redis_url = require_env("REDIS_URL")?;

        let feed_url =
            std::env::var("POLYGON_WS_URL").unwrap_or_else(|_| DEFAULT_FEED_URL.to_string());

        let watchlist = Watchlist::parse(
            &std::env::var("WATCHLIST").unwrap_or_else(|_| DEFAULT_WATCHLIST.to_string()),
        );
        if watchlist.is_empty() {
            return Err(ConfigError::EmptyWatchlist);
        }

        let channel_prefix = std::env::var("RELAY_CHANNEL_PREFIX")
            .unwrap_or_else(|_| DEFAULT_CHANNEL_PREFIX.to_string());

        let websocket = WebSocketSettings {
            reconnect_delay_initial: parse_env_duration_millis(
                "RELAY_RECONNECT_DELAY_INITIAL_MS",
                WebSocketSettings::default().reconnect_delay_initial,
            ),
            reconnect_delay_max: parse_env_duration_secs(
                "RELAY_RECONNECT_DELAY_MAX_SECS",
                WebSocketSettings::default().reconnect_delay_max,
            ),
            max_reconnect_attempts: parse_env_u32(
                "RELAY_MAX_RECONNECT_ATTEMPTS",
                WebSocketSettings::default().max_reconnect_attempts,
            ),
        };

        let health = HealthSettings {
            check_interval: parse_env_duration_secs(
                "RELAY_HEALTH_INTERVAL_SECS",
                HealthSettings::default().check_interval,
            ),
            staleness_window: parse_env_duration_secs(
                "RELAY_STALENESS_SECS",
                HealthSettings::default().staleness_window,
            ),
            port: parse_env_u16("RELAY_HEALTH_PORT", HealthSettings::default().port),
        };

        Ok(Self {
            feed_url,
            api_key: ApiKey::new(api_key),
            redis_url,
            watchlist,
            channel_prefix,
            debug: parse_env_bool("RELAY_DEBUG", false),
            websocket,
            health,
        })
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    /// Environment variable has empty value.
    #[error("environment variable {0} cannot be empty")]
    EmptyValue(String),
    /// Watchlist resolved to zero symbols.
    #[error("watchlist contains no valid symbols")]
    EmptyWatchlist,
}

fn require_env(key: &str) -> Result<String, ConfigError> {
    let value =
        std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))?;
    if value.is_empty() {
        return Err(ConfigError::EmptyValue(key.to_string()));
    }
    Ok(value)
}

fn parse_env_u16(key: &str, default: u16) -> u16 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_env_bool(key: &str, default: bool) -> bool {
    std::env::var(key).map_or(default, |v| {
        matches!(v.to_lowercase().as_str(), "1" | "true" | "yes")
    })
}

fn parse_env_duration_secs(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map_or(default, Duration::from_secs)
}

fn parse_env_duration_millis(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map_or(default, Duration::from_millis)
}
