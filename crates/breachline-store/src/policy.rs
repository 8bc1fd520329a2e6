//! Retry policy for optimistic transactions.

use std::time::Duration;

use rand::Rng;
use tracing::warn;

/// How a store retries a transaction that lost a commit race.
///
/// Attempt `n` (1-based) that conflicts waits
/// `min(base_backoff * 2^(n-1), max_backoff) + random(0..max_jitter)`
/// before the next attempt. Jitter desynchronizes writers that collided
/// on the same document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
    pub max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_backoff: Duration::from_millis(2),
            max_backoff: Duration::from_millis(50),
            max_jitter: Duration::from_millis(3),
        }
    }
}

impl RetryPolicy {
    /// A policy with a different attempt budget and default timings.
    pub fn with_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Default::default()
        }
    }

    /// Clamp out-of-range values so the policy is safe to use.
    ///
    /// - `max_attempts` is at least 1.
    /// - `max_backoff` is at least `base_backoff`.
    pub fn validated(mut self) -> Self {
        if self.max_attempts == 0 {
            warn!("max_attempts is 0, using 1");
            self.max_attempts = 1;
        }
        if self.max_backoff < self.base_backoff {
            warn!(
                base_ms = self.base_backoff.as_millis() as u64,
                max_ms = self.max_backoff.as_millis() as u64,
                "max_backoff below base_backoff, raising it"
            );
            self.max_backoff = self.base_backoff;
        }
        self
    }

    /// Delay before retrying after conflicting attempt `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(16);
        let backoff = self
            .base_backoff
            .saturating_mul(1_u32 << shift)
            .min(self.max_backoff);

        let jitter_us = self.max_jitter.as_micros() as u64;
        let jitter = if jitter_us > 0 {
            Duration::from_micros(rand::rng().random_range(0..jitter_us))
        } else {
            Duration::ZERO
        };
        backoff + jitter
    }
}
