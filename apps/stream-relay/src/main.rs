//! Polygon Stream Relay Binary
//!
//! Starts the market data ingestion worker.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin polygon-stream-relay
//! ```
//!
//! # Environment Variables
//!
//! ## Required
//! - `POLYGON_API_KEY`: Polygon API key
//! - `REDIS_URL`: Redis connection URL
//!
//! ## Optional
//! - `POLYGON_WS_URL`: Upstream WebSocket URL (default: wss://socket.polygon.io/stocks)
//! - `WATCHLIST`: Comma-separated symbols (default: ten large-cap tickers)
//! - `RELAY_CHANNEL_PREFIX`: Pub/sub channel prefix (default: marketdata)
//! - `RELAY_HEALTH_PORT`: Health check HTTP port (default: 8080)
//! - `RELAY_RECONNECT_DELAY_INITIAL_MS`: Initial reconnect delay (default: 1000)
//! - `RELAY_RECONNECT_DELAY_MAX_SECS`: Reconnect delay cap (default: 60)
//! - `RELAY_MAX_RECONNECT_ATTEMPTS`: Reconnect budget (default: 10)
//! - `RELAY_HEALTH_INTERVAL_SECS`: Status log interval (default: 60)
//! - `RELAY_STALENESS_SECS`: Idle window before a staleness warning (default: 300)
//! - `RELAY_DEBUG`: Enable debug logging (default: false)
//! - `RUST_LOG`: Log filter override

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use polygon_stream_relay::application::services::counters::WorkerCounters;
use polygon_stream_relay::application::services::health::{HealthMonitor, HealthMonitorConfig};
use polygon_stream_relay::infrastructure::health::HealthServer;
use polygon_stream_relay::infrastructure::polygon::{BackoffConfig, FeedClient, FeedClientConfig};
use polygon_stream_relay::infrastructure::redis_sink::RedisSink;
use polygon_stream_relay::infrastructure::telemetry;
use polygon_stream_relay::{MessageSink, RelayConfig, init_metrics};
use tokio::signal;
use tokio_util::sync::CancellationToken;

/// Graceful shutdown timeout.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
#[allow(clippy::expect_used)]
async fn main() -> ExitCode {
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("rustls crypto provider installation is critical for TLS");

    load_dotenv();

    // Configuration is validated before any network connection.
    let config = match RelayConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    telemetry::init(config.debug);
    let _metrics_handle = init_metrics();

    tracing::info!("starting Polygon stream relay");
    log_config(&config);

    match run(config).await {
        Ok(()) => {
            tracing::info!("stream relay stopped");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "stream relay failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: RelayConfig) -> anyhow::Result<()> {
    let shutdown_token = CancellationToken::new();
    let counters = Arc::new(WorkerCounters::new());

    let sink: Arc<dyn MessageSink> = Arc::new(
        RedisSink::connect(&config.redis_url, config.channel_prefix.clone()).await?,
    );

    let feed_config = FeedClientConfig {
        url: config.feed_url.clone(),
        api_key: config.api_key.expose().to_string(),
        watchlist: config.watchlist.clone(),
        backoff: BackoffConfig {
            initial_delay: config.websocket.reconnect_delay_initial,
            max_delay: config.websocket.reconnect_delay_max,
            max_attempts: config.websocket.max_reconnect_attempts,
            ..BackoffConfig::default()
        },
    };
    let feed_client = Arc::new(FeedClient::new(
        feed_config,
        Arc::clone(&sink),
        Arc::clone(&counters),
        shutdown_token.clone(),
    ));

    // Spawn health server
    let health_server = HealthServer::new(
        config.health.port,
        Arc::clone(&counters),
        shutdown_token.clone(),
    );
    tokio::spawn(async move {
        if let Err(e) = health_server.run().await {
            tracing::error!(error = %e, "health server error");
        }
    });

    // Spawn periodic health monitor
    let health_monitor = HealthMonitor::new(
        HealthMonitorConfig {
            check_interval: config.health.check_interval,
            staleness_window: config.health.staleness_window,
        },
        Arc::clone(&counters),
        shutdown_token.clone(),
    );
    tokio::spawn(health_monitor.run());

    // Run the feed client on this task; its exit decides the process
    // outcome.
    let mut feed_handle = tokio::spawn(feed_client.run());

    tracing::info!("stream relay ready");

    let result = tokio::select! {
        () = await_shutdown() => {
            tracing::info!(
                timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
                "graceful shutdown started"
            );
            shutdown_token.cancel();

            match tokio::time::timeout(SHUTDOWN_TIMEOUT, &mut feed_handle).await {
                Ok(Ok(result)) => result.map_err(Into::into),
                Ok(Err(join_error)) => Err(join_error.into()),
                Err(_) => {
                    tracing::warn!("feed client did not stop within the shutdown timeout");
                    feed_handle.abort();
                    Ok(())
                }
            }
        }
        feed_result = &mut feed_handle => {
            shutdown_token.cancel();
            match feed_result {
                Ok(result) => result.map_err(Into::into),
                Err(join_error) => Err(join_error.into()),
            }
        }
    };

    sink.close().await;
    result
}

/// Log the parsed configuration.
fn log_config(config: &RelayConfig) {
    tracing::info!(
        feed_url = %config.feed_url,
        symbols = config.watchlist.len(),
        channel_prefix = %config.channel_prefix,
        health_port = config.health.port,
        max_reconnect_attempts = config.websocket.max_reconnect_attempts,
        "configuration loaded"
    );
    tracing::debug!(watchlist = ?config.watchlist.symbols(), "watchlist");
}

/// Load .env file from current directory or any ancestor directory.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
#[allow(clippy::expect_used)]
async fn await_shutdown() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, initiating shutdown");
        }
    }
}
