//! Port Interfaces
//!
//! Contracts the infrastructure adapters implement, following the
//! hexagonal seam the ingestion path depends on. The single outbound
//! port is the message sink: one publish method, one lifecycle method,
//! so tests can substitute an in-memory fake.

use async_trait::async_trait;

use crate::domain::streaming::StreamMessage;

/// Outbound port for fanning one message out to the broker.
///
/// Implementations must never panic or propagate errors across this
/// boundary: a failed send is reported as `false` and logged internally.
/// Delivery is at-most-once; a failed publish is not retried.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageSink: Send + Sync {
    /// Attempt to deliver one message to the per-symbol channel.
    ///
    /// Returns whether the send succeeded.
    async fn publish(&self, symbol: &str, message: &StreamMessage) -> bool;

    /// Release the broker connection. Must not hang indefinitely.
    async fn close(&self);
}
