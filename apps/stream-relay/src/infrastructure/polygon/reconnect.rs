//! Reconnection Policy
//!
//! Exponential backoff for upstream reconnection. The delay curve is a
//! pure function of the attempt count; [`ReconnectPolicy`] layers the
//! attempt counter and optional jitter on top.

use std::time::Duration;

use rand::Rng;

/// Configuration for reconnection behavior.
#[derive(Debug, Clone)]
pub struct BackoffConfig {
    /// Delay before the first reconnection attempt.
    pub initial_delay: Duration,
    /// Cap on the delay between attempts.
    pub max_delay: Duration,
    /// Attempts before reconnection is abandoned as fatal.
    pub max_attempts: u32,
    /// Jitter fraction (0.1 = ±10%). Zero disables jitter.
    pub jitter_factor: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(1000),
            max_delay: Duration::from_secs(60),
            max_attempts: 10,
            jitter_factor: 0.0,
        }
    }
}

impl BackoffConfig {
    /// Delay for a given attempt: `min(initial * 2^attempt, max)`.
    ///
    /// Monotonically non-decreasing in `attempt` and never exceeds
    /// `max_delay`.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base_ms = u64::try_from(self.initial_delay.as_millis()).unwrap_or(u64::MAX);
        // 2^attempt saturates well past any sane cap.
        let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
        let delay_ms = base_ms.saturating_mul(factor);
        Duration::from_millis(delay_ms).min(self.max_delay)
    }
}

/// Reconnection policy tracking the attempt counter.
///
/// `next_delay()` returns `None` once `max_attempts` is reached, which
/// the connection manager treats as fatal exhaustion. `reset()` is
/// called on successful authentication.
#[derive(Debug)]
pub struct ReconnectPolicy {
    config: BackoffConfig,
    attempts: u32,
}

impl ReconnectPolicy {
    /// Create a new policy.
    #[must_use]
    pub const fn new(config: BackoffConfig) -> Self {
        Self {
            config,
            attempts: 0,
        }
    }

    /// Delay before the next attempt, or `None` if attempts are
    /// exhausted. Increments the attempt counter.
    #[must_use]
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempts >= self.config.max_attempts {
            return None;
        }
        let delay = self.config.delay_for_attempt(self.attempts);
        self.attempts += 1;
        Some(self.apply_jitter(delay))
    }

    /// Reset the counter after a successful authentication.
    pub const fn reset(&mut self) {
        self.attempts = 0;
    }

    /// Attempts made since the last reset.
    #[must_use]
    pub const fn attempt_count(&self) -> u32 {
        self.attempts
    }

    fn apply_jitter(&self, delay: Duration) -> Duration {
        if self.config.jitter_factor <= 0.0 {
            return delay;
        }

        #[allow(clippy::cast_precision_loss)]
        let base_ms = delay.as_millis() as f64;
        let range = base_ms * self.config.jitter_factor;
        let jitter: f64 = rand::rng().random_range(-range..=range);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        Duration::from_millis((base_ms + jitter).max(1.0) as u64)
    }
}

/// Error for reconnection failures surfaced to the supervisor.
#[derive(Debug, thiserror::Error)]
pub enum ReconnectError {
    /// Maximum reconnection attempts exceeded.
    #[error("maximum reconnection attempts ({0}) exceeded")]
    MaxAttemptsExceeded(u32),
}
