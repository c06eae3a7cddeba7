//! Polygon WebSocket Adapter
//!
//! Implements the upstream feed connection:
//!
//! - **codec**: JSON array batch decoding
//! - **classify**: raw frames to normalized domain messages
//! - **session**: connection lifecycle state machine
//! - **reconnect**: exponential backoff policy
//! - **feed**: the socket pump tying it together

pub mod classify;
pub mod codec;
pub mod feed;
pub mod messages;
pub mod reconnect;
pub mod session;

pub use classify::classify;
pub use codec::{CodecError, JsonCodec};
pub use feed::{FeedClient, FeedClientConfig, FeedError};
pub use messages::{FeedKind, RequestMessage, StatusFrame, StatusKind};
pub use reconnect::{BackoffConfig, ReconnectError, ReconnectPolicy};
pub use session::{ConnectionState, FeedSession, SessionAction, SessionEvent};
