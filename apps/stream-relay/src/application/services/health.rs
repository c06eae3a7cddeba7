//! Health Monitor
//!
//! Periodic self-check that runs on a fixed timer, independent of
//! message traffic. Each tick emits one structured status record from
//! the shared counters. A connected-and-authenticated session with no
//! recent messages raises a staleness warning only: the feed may simply
//! be idle (market closed), so no reconnect is triggered.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::counters::{CountersSnapshot, WorkerCounters};

/// Configuration for the health monitor.
#[derive(Debug, Clone)]
pub struct HealthMonitorConfig {
    /// Interval between status records.
    pub check_interval: Duration,
    /// Window after which a quiet authenticated feed is reported stale.
    pub staleness_window: Duration,
}

impl Default for HealthMonitorConfig {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(60),
            staleness_window: Duration::from_secs(300),
        }
    }
}

/// Decide whether a snapshot represents a stale feed.
///
/// Stale means: connected and authenticated, but either no message has
/// ever arrived or the last one is older than the window.
#[must_use]
pub fn is_stale(snapshot: &CountersSnapshot, window: Duration) -> bool {
    if !snapshot.is_connected || !snapshot.is_authenticated {
        return false;
    }
    snapshot
        .time_since_last_message
        .map_or(snapshot.uptime >= window, |since| since >= window)
}

/// Periodic health monitor task.
pub struct HealthMonitor {
    config: HealthMonitorConfig,
    counters: Arc<WorkerCounters>,
    cancel: CancellationToken,
}

impl HealthMonitor {
    /// Create a new health monitor.
    #[must_use]
    pub const fn new(
        config: HealthMonitorConfig,
        counters: Arc<WorkerCounters>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            config,
            counters,
            cancel,
        }
    }

    /// Run the monitoring loop until cancelled.
    pub async fn run(self) {
        let mut interval = tokio::time::interval(self.config.check_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // First tick fires immediately; skip it so the first report
        // reflects a full interval of activity.
        interval.tick().await;

        loop {
            tokio::select! {
                () = self.cancel.cancelled() => {
                    tracing::debug!("health monitor cancelled");
                    break;
                }
                _ = interval.tick() => {
                    self.report();
                }
            }
        }
    }

    fn report(&self) {
        let snap = self.counters.snapshot();
        tracing::info!(
            uptime_secs = snap.uptime.as_secs(),
            connected = snap.is_connected,
            authenticated = snap.is_authenticated,
            subscribed_symbols = snap.subscribed_symbols,
            messages = snap.message_count,
            publish_failures = snap.publish_failures,
            reconnect_attempts = snap.reconnect_attempts,
            seconds_since_last_message = snap.time_since_last_message.map(|d| d.as_secs()),
            "worker status"
        );

        if is_stale(&snap, self.config.staleness_window) {
            tracing::warn!(
                staleness_window_secs = self.config.staleness_window.as_secs(),
                "no messages within staleness window; feed may be closed or idle"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn snapshot(
        connected: bool,
        authenticated: bool,
        since_last: Option<Duration>,
        uptime: Duration,
    ) -> CountersSnapshot {
        CountersSnapshot {
            start_time: Utc::now(),
            uptime,
            message_count: 0,
            time_since_last_message: since_last,
            reconnect_attempts: 0,
            is_connected: connected,
            is_authenticated: authenticated,
            subscribed_symbols: 0,
            publish_failures: 0,
        }
    }

    const WINDOW: Duration = Duration::from_secs(300);

    #[test]
    fn quiet_authenticated_feed_is_stale() {
        let snap = snapshot(
            true,
            true,
            Some(Duration::from_secs(301)),
            Duration::from_secs(600),
        );
        assert!(is_stale(&snap, WINDOW));
    }

    #[test]
    fn recent_message_is_not_stale() {
        let snap = snapshot(
            true,
            true,
            Some(Duration::from_secs(10)),
            Duration::from_secs(600),
        );
        assert!(!is_stale(&snap, WINDOW));
    }

    #[test]
    fn disconnected_feed_is_never_stale() {
        let snap = snapshot(
            false,
            false,
            Some(Duration::from_secs(900)),
            Duration::from_secs(1000),
        );
        assert!(!is_stale(&snap, WINDOW));
    }

    #[test]
    fn connected_but_unauthenticated_is_not_stale() {
        let snap = snapshot(true, false, None, Duration::from_secs(1000));
        assert!(!is_stale(&snap, WINDOW));
    }

    #[test]
    fn no_messages_ever_uses_uptime() {
        // Fresh process: not yet past the window.
        let young = snapshot(true, true, None, Duration::from_secs(10));
        assert!(!is_stale(&young, WINDOW));

        // Authenticated for longer than the window without one message.
        let old = snapshot(true, true, None, Duration::from_secs(600));
        assert!(is_stale(&old, WINDOW));
    }

    #[tokio::test]
    async fn monitor_stops_on_cancellation() {
        let config = HealthMonitorConfig {
            check_interval: Duration::from_secs(60),
            staleness_window: Duration::from_secs(300),
        };
        let counters = Arc::new(WorkerCounters::new());
        let cancel = CancellationToken::new();
        let monitor = HealthMonitor::new(config, counters, cancel.clone());

        let handle = tokio::spawn(monitor.run());
        cancel.cancel();

        let result = tokio::time::timeout(Duration::from_millis(100), handle).await;
        assert!(result.is_ok(), "monitor should shut down on cancellation");
    }
}
