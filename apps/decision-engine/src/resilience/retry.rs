//! Retry policy with exponential backoff for downstream service calls.
//!
//! # Retryable Errors
//!
//! | Retryable | Non-Retryable |
//! |-----------|---------------|
//! | HTTP 5xx | HTTP 4xx (bad request, auth, validation) |
//! | Network timeouts | |
//! | Connection errors | |

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Retry policy for a downstream service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of call attempts (default: 3).
    pub max_retries: u32,
    /// Base delay; attempt `n` waits `backoff_factor * 2^n` (default: 500ms).
    pub backoff_factor: Duration,
    /// Cap on any single backoff delay (default: 30s).
    pub max_backoff: Duration,
    /// Jitter factor for randomization (default: 0.1 = ±10%; 0 disables).
    pub jitter_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_factor: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
            jitter_factor: 0.1,
        }
    }
}

/// Calculator for the delays between attempts of one logical call.
///
/// Yields `max_retries - 1` delays (there is no sleep after the final
/// attempt).
#[derive(Debug)]
pub struct ExponentialBackoff {
    attempt: u32,
    max_sleeps: u32,
    backoff_factor_ms: u64,
    max_backoff_ms: u64,
    jitter_factor: f64,
}

impl ExponentialBackoff {
    /// Create a backoff calculator from a retry policy.
    #[must_use]
    pub const fn new(policy: &RetryPolicy) -> Self {
        Self {
            attempt: 0,
            max_sleeps: policy.max_retries.saturating_sub(1),
            backoff_factor_ms: policy.backoff_factor.as_millis() as u64,
            max_backoff_ms: policy.max_backoff.as_millis() as u64,
            jitter_factor: policy.jitter_factor,
        }
    }

    /// Next delay, or `None` when all attempts are used up.
    pub fn next_backoff(&mut self) -> Option<Duration> {
        if self.attempt >= self.max_sleeps {
            return None;
        }

        let base_ms = self
            .backoff_factor_ms
            .saturating_mul(1u64 << self.attempt.min(32))
            .min(self.max_backoff_ms);
        let jittered_ms = self.apply_jitter(base_ms).min(self.max_backoff_ms);

        self.attempt += 1;

        Some(Duration::from_millis(jittered_ms))
    }

    /// Current attempt count (number of delays already handed out).
    #[must_use]
    pub const fn attempt(&self) -> u32 {
        self.attempt
    }

    fn apply_jitter(&self, base_ms: u64) -> u64 {
        if self.jitter_factor <= 0.0 {
            return base_ms;
        }
        let mut rng = rand::rng();
        let jitter_range = base_ms as f64 * self.jitter_factor;
        let min = (base_ms as f64 - jitter_range).max(0.0);
        let max = base_ms as f64 + jitter_range;

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let jittered = rng.random_range(min..=max) as u64;
        jittered
    }
}

/// Whether an HTTP status counts as a retryable (transient) failure.
///
/// 5xx is retryable; anything in [400, 500) is a terminal client error.
#[must_use]
pub const fn is_retryable_status(status: u16) -> bool {
    status >= 500
}
