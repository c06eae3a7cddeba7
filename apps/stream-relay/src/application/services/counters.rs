//! Worker Counters
//!
//! Aggregated ingestion state shared between the connection manager
//! (sole writer) and the health monitor / health endpoint (readers).
//! Created once at startup by the supervisor and passed by reference to
//! both sides; no module-level singletons, so multiple workers can be
//! unit-tested in isolation.
//!
//! Fields are independently atomic; there is no cross-field consistency
//! requirement, so no lock spans more than one field.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

/// Mutable counters for one worker instance.
#[derive(Debug)]
pub struct WorkerCounters {
    started_at: Instant,
    start_time: DateTime<Utc>,
    message_count: AtomicU64,
    last_message_at: RwLock<Option<Instant>>,
    reconnect_attempts: AtomicU32,
    is_connected: AtomicBool,
    is_authenticated: AtomicBool,
    subscribed_symbols: AtomicUsize,
    publish_failures: AtomicU64,
}

impl Default for WorkerCounters {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkerCounters {
    /// Create counters at process start.
    #[must_use]
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            start_time: Utc::now(),
            message_count: AtomicU64::new(0),
            last_message_at: RwLock::new(None),
            reconnect_attempts: AtomicU32::new(0),
            is_connected: AtomicBool::new(false),
            is_authenticated: AtomicBool::new(false),
            subscribed_symbols: AtomicUsize::new(0),
            publish_failures: AtomicU64::new(0),
        }
    }

    /// Record one inbound data frame.
    pub fn record_message(&self) {
        self.message_count.fetch_add(1, Ordering::Relaxed);
        *self.last_message_at.write() = Some(Instant::now());
    }

    /// Record one failed publish.
    pub fn record_publish_failure(&self) {
        self.publish_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Update the connected flag.
    pub fn set_connected(&self, connected: bool) {
        self.is_connected.store(connected, Ordering::Relaxed);
    }

    /// Update the authenticated flag.
    pub fn set_authenticated(&self, authenticated: bool) {
        self.is_authenticated.store(authenticated, Ordering::Relaxed);
    }

    /// Update the subscribed symbol count.
    pub fn set_subscribed_symbols(&self, count: usize) {
        self.subscribed_symbols.store(count, Ordering::Relaxed);
    }

    /// Increment the reconnect attempt counter.
    pub fn increment_reconnect_attempts(&self) {
        self.reconnect_attempts.fetch_add(1, Ordering::Relaxed);
    }

    /// Reset the reconnect attempt counter (on successful authentication).
    pub fn reset_reconnect_attempts(&self) {
        self.reconnect_attempts.store(0, Ordering::Relaxed);
    }

    /// Current reconnect attempt count.
    #[must_use]
    pub fn reconnect_attempts(&self) -> u32 {
        self.reconnect_attempts.load(Ordering::Relaxed)
    }

    /// Total inbound data frames.
    #[must_use]
    pub fn message_count(&self) -> u64 {
        self.message_count.load(Ordering::Relaxed)
    }

    /// Total messages dropped because a publish failed.
    #[must_use]
    pub fn publish_failures(&self) -> u64 {
        self.publish_failures.load(Ordering::Relaxed)
    }

    /// Whether the upstream socket is open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.is_connected.load(Ordering::Relaxed)
    }

    /// Whether the upstream session is authenticated.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.is_authenticated.load(Ordering::Relaxed)
    }

    /// Point-in-time copy of every counter for reporting.
    #[must_use]
    pub fn snapshot(&self) -> CountersSnapshot {
        CountersSnapshot {
            start_time: self.start_time,
            uptime: self.started_at.elapsed(),
            message_count: self.message_count.load(Ordering::Relaxed),
            time_since_last_message: self.last_message_at.read().map(|t| t.elapsed()),
            reconnect_attempts: self.reconnect_attempts.load(Ordering::Relaxed),
            is_connected: self.is_connected.load(Ordering::Relaxed),
            is_authenticated: self.is_authenticated.load(Ordering::Relaxed),
            subscribed_symbols: self.subscribed_symbols.load(Ordering::Relaxed),
            publish_failures: self.publish_failures.load(Ordering::Relaxed),
        }
    }
}

/// Read-only copy of [`WorkerCounters`] taken at one instant.
#[derive(Debug, Clone)]
pub struct CountersSnapshot {
    /// Wall-clock process start time.
    pub start_time: DateTime<Utc>,
    /// Time since process start.
    pub uptime: Duration,
    /// Total inbound data frames.
    pub message_count: u64,
    /// Time since the last data frame, if any has arrived.
    pub time_since_last_message: Option<Duration>,
    /// Reconnect attempts since the last successful authentication.
    pub reconnect_attempts: u32,
    /// Upstream socket open.
    pub is_connected: bool,
    /// Upstream session authenticated.
    pub is_authenticated: bool,
    /// Symbols covered by the current subscription.
    pub subscribed_symbols: usize,
    /// Total failed publishes.
    pub publish_failures: u64,
}
