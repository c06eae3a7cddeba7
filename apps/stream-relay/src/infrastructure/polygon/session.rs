//! Feed Session State Machine
//!
//! The connection lifecycle modeled as an explicit state machine with a
//! single [`FeedSession::handle`] entry point, so handshake ordering and
//! recovery behavior are unit-testable without a socket. The socket loop
//! in [`super::feed`] feeds events in and performs the returned actions.
//!
//! Invariants:
//! - authentication is only sent from `Connected`
//! - subscription is only sent after `auth_success`
//! - `auth_failed` never triggers a subscription and never tears down
//!   the socket; the next reconnect retries the full handshake
//! - duplicate close events schedule at most one reconnect

use std::sync::Arc;

use serde_json::Value;

use super::classify::classify;
use super::messages::{FeedKind, RequestMessage, StatusFrame, StatusKind};
use crate::application::services::counters::WorkerCounters;
use crate::domain::streaming::StreamMessage;
use crate::domain::watchlist::Watchlist;

/// Connection lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No socket.
    Disconnected,
    /// Socket dial in progress.
    Connecting,
    /// Socket open, authentication not yet sent.
    Connected,
    /// Authentication request sent, awaiting the status frame.
    Authenticating,
    /// Authentication accepted, subscription not yet sent.
    Authenticated,
    /// Subscription requests sent; normal data flow.
    Subscribed,
    /// Terminal: supervisor-initiated shutdown.
    ShuttingDown,
}

/// Events fed into the session by the socket loop.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// The socket finished opening.
    Opened,
    /// One decoded inbound frame.
    Frame(Value),
    /// Transport-level error (the close event drives recovery).
    SocketError(String),
    /// The socket closed.
    Closed,
}

/// Actions the socket loop must perform in order.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionAction {
    /// Send a request upstream.
    Send(RequestMessage),
    /// Hand a normalized message to the publisher.
    Publish(StreamMessage),
    /// Ask the reconnect scheduler for a retry.
    ScheduleReconnect,
}

/// Per-connection session state machine.
pub struct FeedSession {
    state: ConnectionState,
    api_key: String,
    watchlist: Watchlist,
    counters: Arc<WorkerCounters>,
}

impl FeedSession {
    /// Create a session in `Disconnected`.
    #[must_use]
    pub const fn new(api_key: String, watchlist: Watchlist, counters: Arc<WorkerCounters>) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            api_key,
            watchlist,
            counters,
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> ConnectionState {
        self.state
    }

    /// Mark a dial in progress. No-op while shutting down.
    pub const fn begin_connect(&mut self) {
        if !matches!(self.state, ConnectionState::ShuttingDown) {
            self.state = ConnectionState::Connecting;
        }
    }

    /// Enter the terminal shutdown state.
    pub fn begin_shutdown(&mut self) {
        self.state = ConnectionState::ShuttingDown;
    }

    /// Process one event, returning the actions to perform in order.
    pub fn handle(&mut self, event: SessionEvent) -> Vec<SessionAction> {
        match event {
            SessionEvent::Opened => self.on_opened(),
            SessionEvent::Frame(frame) => self.on_frame(&frame),
            SessionEvent::SocketError(reason) => {
                // The subsequent close event drives recovery.
                tracing::warn!(%reason, "upstream socket error");
                Vec::new()
            }
            SessionEvent::Closed => self.on_closed(),
        }
    }

    fn on_opened(&mut self) -> Vec<SessionAction> {
        if matches!(self.state, ConnectionState::ShuttingDown) {
            return Vec::new();
        }

        self.state = ConnectionState::Connected;
        self.counters.set_connected(true);
        tracing::info!("upstream socket open, authenticating");

        // Auth is only ever sent from Connected.
        self.state = ConnectionState::Authenticating;
        vec![SessionAction::Send(RequestMessage::auth(&self.api_key))]
    }

    fn on_frame(&mut self, frame: &Value) -> Vec<SessionAction> {
        if frame.get("ev").and_then(Value::as_str) == Some("status") {
            return self.on_status(frame);
        }

        if let Some(message) = classify(frame) {
            self.counters.record_message();
            return vec![SessionAction::Publish(message)];
        }

        tracing::debug!("dropping unrecognized frame");
        Vec::new()
    }

    fn on_status(&mut self, frame: &Value) -> Vec<SessionAction> {
        let Ok(status) = serde_json::from_value::<StatusFrame>(frame.clone()) else {
            tracing::debug!("dropping malformed status frame");
            return Vec::new();
        };

        match status.kind() {
            StatusKind::AuthSuccess => self.on_auth_success(),
            StatusKind::AuthFailed => {
                // Stay on this socket; the next reconnect retries the
                // full handshake.
                self.state = ConnectionState::Connected;
                self.counters.set_authenticated(false);
                tracing::error!(
                    message = status.message.as_deref().unwrap_or(""),
                    "upstream authentication failed"
                );
                Vec::new()
            }
            StatusKind::Error => {
                tracing::warn!(
                    message = status.message.as_deref().unwrap_or(""),
                    "upstream status error"
                );
                Vec::new()
            }
            StatusKind::Connected | StatusKind::Other => {
                tracing::debug!(status = %status.status, "upstream status");
                Vec::new()
            }
        }
    }

    fn on_auth_success(&mut self) -> Vec<SessionAction> {
        if !matches!(self.state, ConnectionState::Authenticating) {
            tracing::debug!(state = ?self.state, "ignoring auth_success outside handshake");
            return Vec::new();
        }

        self.state = ConnectionState::Authenticated;
        self.counters.set_authenticated(true);
        self.counters.reset_reconnect_attempts();
        tracing::info!(symbols = self.watchlist.len(), "authenticated, subscribing");

        // Subscription is rebuilt from scratch on every successful
        // authentication; upstream sessions do not persist it.
        let actions: Vec<SessionAction> = FeedKind::TRACKED
            .iter()
            .map(|kind| SessionAction::Send(RequestMessage::subscribe(*kind, &self.watchlist)))
            .collect();

        self.state = ConnectionState::Subscribed;
        self.counters.set_subscribed_symbols(self.watchlist.len());
        actions
    }

    fn on_closed(&mut self) -> Vec<SessionAction> {
        match self.state {
            // Already disconnected: a reconnect is pending, don't
            // schedule another.
            ConnectionState::Disconnected => Vec::new(),
            ConnectionState::ShuttingDown => {
                self.counters.set_connected(false);
                self.counters.set_authenticated(false);
                Vec::new()
            }
            _ => {
                self.state = ConnectionState::Disconnected;
                self.counters.set_connected(false);
                self.counters.set_authenticated(false);
                self.counters.set_subscribed_symbols(0);
                tracing::warn!("upstream socket closed");
                vec![SessionAction::ScheduleReconnect]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn session() -> (FeedSession, Arc<WorkerCounters>) {
        let counters = Arc::new(WorkerCounters::new());
        let session = FeedSession::new(
            "test-key".to_string(),
            Watchlist::parse("AAPL,MSFT"),
            Arc::clone(&counters),
        );
        (session, counters)
    }

    fn auth_success() -> SessionEvent {
        SessionEvent::Frame(json!({"ev": "status", "status": "auth_success"}))
    }

    fn open_and_authenticate(session: &mut FeedSession) {
        session.begin_connect();
        let _ = session.handle(SessionEvent::Opened);
        let _ = session.handle(auth_success());
        assert_eq!(session.state(), ConnectionState::Subscribed);
    }

    #[test]
    fn open_sends_auth_exactly_once() {
        let (mut session, counters) = session();
        session.begin_connect();

        let actions = session.handle(SessionEvent::Opened);
        assert_eq!(
            actions,
            vec![SessionAction::Send(RequestMessage::auth("test-key"))]
        );
        assert_eq!(session.state(), ConnectionState::Authenticating);
        assert!(counters.is_connected());
        assert!(!counters.is_authenticated());
    }

    #[test]
    fn auth_success_subscribes_per_kind_over_full_watchlist() {
        let (mut session, counters) = session();
        session.begin_connect();
        let _ = session.handle(SessionEvent::Opened);

        let actions = session.handle(auth_success());
        assert_eq!(
            actions,
            vec![
                SessionAction::Send(RequestMessage {
                    action: "subscribe".to_string(),
                    params: "T.AAPL,T.MSFT".to_string(),
                }),
                SessionAction::Send(RequestMessage {
                    action: "subscribe".to_string(),
                    params: "AM.AAPL,AM.MSFT".to_string(),
                }),
            ]
        );
        assert_eq!(session.state(), ConnectionState::Subscribed);
        assert!(counters.is_authenticated());
        assert_eq!(counters.snapshot().subscribed_symbols, 2);
    }

    #[test]
    fn auth_failed_never_subscribes() {
        let (mut session, counters) = session();
        session.begin_connect();
        let _ = session.handle(SessionEvent::Opened);

        let actions = session.handle(SessionEvent::Frame(
            json!({"ev": "status", "status": "auth_failed", "message": "bad key"}),
        ));
        assert!(actions.is_empty());
        assert_eq!(session.state(), ConnectionState::Connected);
        assert!(!counters.is_authenticated());
    }

    #[test]
    fn auth_success_before_handshake_is_ignored() {
        let (mut session, _) = session();
        // No Opened event; subscription must not be sent from
        // Disconnected.
        let actions = session.handle(auth_success());
        assert!(actions.is_empty());
        assert_eq!(session.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn data_frames_publish_and_count() {
        let (mut session, counters) = session();
        open_and_authenticate(&mut session);

        let actions = session.handle(SessionEvent::Frame(
            json!({"ev": "T", "sym": "AAPL", "p": 189.0, "s": 50, "t": 1}),
        ));
        assert_eq!(actions.len(), 1);
        assert!(matches!(&actions[0], SessionAction::Publish(m) if m.symbol == "AAPL"));
        assert_eq!(counters.message_count(), 1);
    }

    #[test]
    fn unrecognized_frames_neither_publish_nor_count() {
        let (mut session, counters) = session();
        open_and_authenticate(&mut session);

        let actions = session.handle(SessionEvent::Frame(json!({"ev": "X", "sym": "AAPL"})));
        assert!(actions.is_empty());
        assert_eq!(counters.message_count(), 0);
    }

    #[test]
    fn close_schedules_reconnect_once() {
        let (mut session, counters) = session();
        open_and_authenticate(&mut session);

        let first = session.handle(SessionEvent::Closed);
        assert_eq!(first, vec![SessionAction::ScheduleReconnect]);
        assert!(!counters.is_connected());
        assert!(!counters.is_authenticated());

        // Duplicate close: already disconnected, nothing scheduled.
        let second = session.handle(SessionEvent::Closed);
        assert!(second.is_empty());
    }

    #[test]
    fn socket_error_does_not_transition() {
        let (mut session, _) = session();
        open_and_authenticate(&mut session);

        let actions = session.handle(SessionEvent::SocketError("reset by peer".to_string()));
        assert!(actions.is_empty());
        assert_eq!(session.state(), ConnectionState::Subscribed);
    }

    #[test]
    fn reconnect_counter_resets_on_successful_auth() {
        let (mut session, counters) = session();
        counters.increment_reconnect_attempts();
        counters.increment_reconnect_attempts();
        counters.increment_reconnect_attempts();
        assert_eq!(counters.reconnect_attempts(), 3);

        open_and_authenticate(&mut session);
        assert_eq!(counters.reconnect_attempts(), 0);
    }

    #[test]
    fn close_during_shutdown_does_not_reconnect() {
        let (mut session, _) = session();
        open_and_authenticate(&mut session);

        session.begin_shutdown();
        let actions = session.handle(SessionEvent::Closed);
        assert!(actions.is_empty());
        assert_eq!(session.state(), ConnectionState::ShuttingDown);
    }

    #[test]
    fn reauthentication_after_reconnect_resubscribes_from_scratch() {
        let (mut session, counters) = session();
        open_and_authenticate(&mut session);
        let _ = session.handle(SessionEvent::Closed);

        session.begin_connect();
        let _ = session.handle(SessionEvent::Opened);
        let actions = session.handle(auth_success());
        // Full watchlist again, both kinds.
        assert_eq!(actions.len(), 2);
        assert_eq!(counters.snapshot().subscribed_symbols, 2);
    }
}
