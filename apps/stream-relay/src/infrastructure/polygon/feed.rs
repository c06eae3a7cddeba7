//! Polygon WebSocket Feed Client
//!
//! Owns the single upstream connection. Runs the connect / authenticate /
//! subscribe / pump loop, delegating lifecycle decisions to
//! [`FeedSession`] and retry pacing to [`ReconnectPolicy`]. Decoded data
//! frames are handed to the configured [`MessageSink`]; a failed publish
//! is counted and dropped, it never interrupts ingestion.

use std::fmt::Display;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use super::codec::JsonCodec;
use super::reconnect::{BackoffConfig, ReconnectPolicy};
use super::session::{ConnectionState, FeedSession, SessionAction, SessionEvent};
use crate::application::ports::MessageSink;
use crate::application::services::counters::WorkerCounters;
use crate::domain::watchlist::Watchlist;
use crate::infrastructure::metrics;

/// Errors that can occur in the feed client.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    /// WebSocket connection failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Connection closed by the server.
    #[error("connection closed")]
    ConnectionClosed,

    /// Maximum reconnection attempts exceeded.
    #[error("maximum reconnection attempts exceeded")]
    MaxReconnectAttemptsExceeded,
}

/// Configuration for the feed client.
#[derive(Debug, Clone)]
pub struct FeedClientConfig {
    /// WebSocket URL of the upstream feed.
    pub url: String,
    /// Polygon API key.
    pub api_key: String,
    /// Symbols to subscribe to.
    pub watchlist: Watchlist,
    /// Reconnection backoff configuration.
    pub backoff: BackoffConfig,
}

/// WebSocket client for the Polygon stock feed.
///
/// Manages the connection lifecycle including authentication,
/// subscription and automatic reconnection with exponential backoff.
pub struct FeedClient {
    config: FeedClientConfig,
    codec: JsonCodec,
    sink: Arc<dyn MessageSink>,
    counters: Arc<WorkerCounters>,
    cancel: CancellationToken,
}

impl FeedClient {
    /// Create a new feed client.
    #[must_use]
    pub fn new(
        config: FeedClientConfig,
        sink: Arc<dyn MessageSink>,
        counters: Arc<WorkerCounters>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            config,
            codec: JsonCodec::new(),
            sink,
            counters,
            cancel,
        }
    }

    /// Run the feed connection loop.
    ///
    /// Connects, authenticates, subscribes and pumps messages until
    /// cancelled or the reconnect budget is exhausted.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::MaxReconnectAttemptsExceeded`] once
    /// consecutive connection failures exceed the configured limit.
    pub async fn run(self: Arc<Self>) -> Result<(), FeedError> {
        let mut policy = ReconnectPolicy::new(self.config.backoff.clone());
        let mut session = FeedSession::new(
            self.config.api_key.clone(),
            self.config.watchlist.clone(),
            Arc::clone(&self.counters),
        );

        loop {
            if self.cancel.is_cancelled() {
                tracing::info!("feed client cancelled");
                session.begin_shutdown();
                return Ok(());
            }

            match self.connect_and_run(&mut session, &mut policy).await {
                Ok(()) => {
                    tracing::info!("feed connection closed gracefully");
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!(error = %e, "feed connection error");

                    if let Some(delay) = policy.next_delay() {
                        let attempt = policy.attempt_count();
                        self.counters.increment_reconnect_attempts();
                        metrics::record_reconnect();
                        tracing::info!(
                            attempt,
                            delay_ms = delay.as_millis(),
                            "reconnecting to upstream feed"
                        );

                        tokio::select! {
                            () = self.cancel.cancelled() => {
                                tracing::info!("feed client cancelled during reconnect delay");
                                session.begin_shutdown();
                                return Ok(());
                            }
                            () = tokio::time::sleep(delay) => {}
                        }
                    } else {
                        tracing::error!(
                            attempts = policy.attempt_count(),
                            "reconnect attempts exhausted"
                        );
                        return Err(FeedError::MaxReconnectAttemptsExceeded);
                    }
                }
            }
        }
    }

    /// Connect and pump messages until error or cancellation.
    async fn connect_and_run(
        &self,
        session: &mut FeedSession,
        policy: &mut ReconnectPolicy,
    ) -> Result<(), FeedError> {
        session.begin_connect();
        tracing::info!(url = %self.config.url, "connecting to upstream feed");

        let (ws_stream, _response) = tokio_tungstenite::connect_async(&self.config.url).await?;
        let (mut write, mut read) = ws_stream.split();

        for action in session.handle(SessionEvent::Opened) {
            self.perform(action, &mut write).await?;
        }

        loop {
            tokio::select! {
                () = self.cancel.cancelled() => {
                    session.begin_shutdown();
                    let _ = write.send(Message::Close(None)).await;
                    let _ = session.handle(SessionEvent::Closed);
                    return Ok(());
                }
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            let before = session.state();
                            self.handle_text(session, &text, &mut write).await?;
                            if before != ConnectionState::Subscribed
                                && session.state() == ConnectionState::Subscribed
                            {
                                // The reconnect budget covers consecutive
                                // failures; a completed handshake clears it.
                                policy.reset();
                            }
                        }
                        Some(Ok(Message::Ping(data))) => {
                            write.send(Message::Pong(data)).await?;
                        }
                        Some(Ok(Message::Close(_))) => {
                            tracing::info!("server sent close frame");
                            let _ = session.handle(SessionEvent::Closed);
                            return Err(FeedError::ConnectionClosed);
                        }
                        Some(Ok(_)) => {
                            // Ignore binary and pong frames.
                        }
                        Some(Err(e)) => {
                            let _ = session.handle(SessionEvent::SocketError(e.to_string()));
                            let _ = session.handle(SessionEvent::Closed);
                            return Err(e.into());
                        }
                        None => {
                            tracing::info!("upstream stream ended");
                            let _ = session.handle(SessionEvent::Closed);
                            return Err(FeedError::ConnectionClosed);
                        }
                    }
                }
            }
        }
    }

    /// Decode one inbound text payload and run the resulting actions.
    ///
    /// Undecodable payloads are dropped with a warning; ingestion keeps
    /// going on the same socket.
    ///
    /// # Errors
    ///
    /// Returns an error only when a request cannot be written to the
    /// socket.
    pub async fn handle_text<W>(
        &self,
        session: &mut FeedSession,
        text: &str,
        write: &mut W,
    ) -> Result<(), FeedError>
    where
        W: SinkExt<Message> + Unpin,
        W::Error: Display,
    {
        let frames = match self.codec.decode(text) {
            Ok(frames) => frames,
            Err(e) => {
                tracing::warn!(error = %e, "dropping undecodable payload");
                return Ok(());
            }
        };

        for frame in frames {
            for action in session.handle(SessionEvent::Frame(frame)) {
                self.perform(action, write).await?;
            }
        }

        Ok(())
    }

    /// Execute one session action.
    async fn perform<W>(&self, action: SessionAction, write: &mut W) -> Result<(), FeedError>
    where
        W: SinkExt<Message> + Unpin,
        W::Error: Display,
    {
        match action {
            SessionAction::Send(request) => {
                let json = request.to_json().map_err(|e| {
                    FeedError::ConnectionFailed(format!("failed to serialize request: {e}"))
                })?;
                write.send(Message::Text(json.into())).await.map_err(|e| {
                    FeedError::ConnectionFailed(format!("failed to send request: {e}"))
                })?;
            }
            SessionAction::Publish(message) => {
                metrics::record_message(message.kind());
                if !self.sink.publish(&message.symbol, &message).await {
                    self.counters.record_publish_failure();
                    metrics::record_publish_failure();
                }
            }
            SessionAction::ScheduleReconnect => {
                // Recovery is driven by the run loop when
                // connect_and_run returns an error.
            }
        }
        Ok(())
    }
}
