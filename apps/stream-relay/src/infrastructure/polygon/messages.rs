//! Polygon WebSocket Message Types
//!
//! Wire types for the upstream feed. Requests are `{action, params}`
//! JSON objects; responses arrive as JSON arrays of frames tagged with
//! an `ev` field. Only status frames are deserialized into a typed
//! struct here; data frames stay as raw JSON values until the
//! classifier maps them to normalized [`crate::domain::streaming::StreamMessage`]s.
//!
//! # Request Wire Format (JSON)
//! ```json
//! {"action": "auth", "params": "<api key>"}
//! {"action": "subscribe", "params": "T.AAPL,T.MSFT"}
//! ```
//!
//! # Status Frame (JSON)
//! ```json
//! {"ev": "status", "status": "auth_success", "message": "authenticated"}
//! ```

use serde::{Deserialize, Serialize};

use crate::domain::watchlist::Watchlist;

/// Data kinds the worker subscribes to.
///
/// The prefix is Polygon's channel prefix in subscription params
/// (`T.AAPL`, `AM.AAPL`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedKind {
    /// Executed trades (`T.*`).
    Trades,
    /// Minute aggregate bars (`AM.*`).
    MinuteBars,
}

impl FeedKind {
    /// Kinds tracked by this worker, in subscription order.
    pub const TRACKED: [Self; 2] = [Self::Trades, Self::MinuteBars];

    /// Channel prefix used in subscription params.
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Trades => "T",
            Self::MinuteBars => "AM",
        }
    }
}

/// Outbound `{action, params}` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestMessage {
    /// Request verb: "auth" or "subscribe".
    pub action: String,
    /// Verb-specific parameter string.
    pub params: String,
}

impl RequestMessage {
    /// Authentication request carrying the API key.
    #[must_use]
    pub fn auth(api_key: &str) -> Self {
        Self {
            action: "auth".to_string(),
            params: api_key.to_string(),
        }
    }

    /// Subscription request covering the full watchlist for one kind.
    #[must_use]
    pub fn subscribe(kind: FeedKind, watchlist: &Watchlist) -> Self {
        let params = watchlist
            .iter()
            .map(|symbol| format!("{}.{symbol}", kind.prefix()))
            .collect::<Vec<_>>()
            .join(",");
        Self {
            action: "subscribe".to_string(),
            params,
        }
    }

    /// Serialize to the JSON wire form.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (should not happen with
    /// valid data).
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Inbound status/control frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusFrame {
    /// Status value, e.g. "connected", "auth_success", "auth_failed".
    pub status: String,
    /// Optional human-readable detail.
    #[serde(default)]
    pub message: Option<String>,
}

impl StatusFrame {
    /// Parse the status value into a known kind.
    #[must_use]
    pub fn kind(&self) -> StatusKind {
        match self.status.as_str() {
            "connected" => StatusKind::Connected,
            "auth_success" => StatusKind::AuthSuccess,
            "auth_failed" => StatusKind::AuthFailed,
            "error" => StatusKind::Error,
            _ => StatusKind::Other,
        }
    }
}

/// Known status values of a [`StatusFrame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    /// Socket-level welcome, precedes authentication.
    Connected,
    /// Authentication accepted.
    AuthSuccess,
    /// Authentication rejected.
    AuthFailed,
    /// Upstream-reported error.
    Error,
    /// Any other status value (success acks, etc.).
    Other,
}
