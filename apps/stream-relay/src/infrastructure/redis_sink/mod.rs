//! Redis Publish Sink
//!
//! Publishes normalized messages to Redis pub/sub channels, one channel
//! per symbol (`<prefix>.<SYMBOL>`). Delivery is at most once: a failed
//! or timed-out publish is logged and dropped so a broker hiccup never
//! stalls ingestion.

use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

use crate::application::ports::MessageSink;
use crate::domain::streaming::StreamMessage;

/// Default wait before giving up on a single publish.
pub const DEFAULT_PUBLISH_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors from establishing the Redis connection.
#[derive(Debug, thiserror::Error)]
pub enum RedisSinkError {
    /// Invalid connection URL.
    #[error("invalid Redis URL: {0}")]
    InvalidUrl(redis::RedisError),

    /// Initial connection failed.
    #[error("Redis connection failed: {0}")]
    ConnectionFailed(redis::RedisError),
}

/// [`MessageSink`] backed by Redis pub/sub.
///
/// Holds a [`ConnectionManager`], which multiplexes commands over one
/// connection and re-establishes it after broker restarts.
pub struct RedisSink {
    connection: ConnectionManager,
    channel_prefix: String,
    publish_timeout: Duration,
}

impl RedisSink {
    /// Connect to Redis and build the sink.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is malformed or the initial
    /// connection cannot be established.
    pub async fn connect(url: &str, channel_prefix: String) -> Result<Self, RedisSinkError> {
        let client = redis::Client::open(url).map_err(RedisSinkError::InvalidUrl)?;
        let connection = client
            .get_connection_manager()
            .await
            .map_err(RedisSinkError::ConnectionFailed)?;
        tracing::info!(prefix = %channel_prefix, "connected to Redis");

        Ok(Self {
            connection,
            channel_prefix,
            publish_timeout: DEFAULT_PUBLISH_TIMEOUT,
        })
    }

}

#[async_trait]
impl MessageSink for RedisSink {
    async fn publish(&self, symbol: &str, message: &StreamMessage) -> bool {
        let payload = match serde_json::to_string(message) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(symbol, error = %e, "failed to serialize message, dropping");
                return false;
            }
        };

        let channel = message.channel(&self.channel_prefix);
        let mut connection = self.connection.clone();
        let publish = connection.publish::<_, _, i64>(&channel, &payload);

        match tokio::time::timeout(self.publish_timeout, publish).await {
            Ok(Ok(_receivers)) => true,
            Ok(Err(e)) => {
                tracing::warn!(channel = %channel, error = %e, "publish failed, dropping message");
                false
            }
            Err(_) => {
                tracing::warn!(
                    channel = %channel,
                    timeout_ms = self.publish_timeout.as_millis(),
                    "publish timed out, dropping message"
                );
                false
            }
        }
    }

    async fn close(&self) {
        // ConnectionManager has no explicit shutdown; dropping the last
        // clone closes the connection.
        tracing::info!("Redis sink closing");
    }
}
