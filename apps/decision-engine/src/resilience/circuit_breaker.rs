//! Circuit breaker for downstream service resilience.
//!
//! Prevents cascading failures when an analysis, execution, or ledger
//! service becomes unavailable or unresponsive.
//!
//! # State Machine
//!
//! ```text
//! CLOSED → OPEN (consecutive failures >= threshold)
//! OPEN → HALF_OPEN (cooldown elapsed)
//! HALF_OPEN → CLOSED (trial call succeeds)
//! HALF_OPEN → OPEN (trial call fails)
//! ```
//!
//! The breaker is a pure state machine: it performs no I/O and knows
//! nothing about transports, so transitions can be unit-tested without
//! any network simulation. One breaker exists per downstream base
//! address and serializes concurrent updates behind a mutex.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Circuit breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    /// Calls flow normally.
    Closed,
    /// Calls are rejected without a network attempt.
    Open,
    /// One trial call is permitted.
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed => write!(f, "CLOSED"),
            Self::Open => write!(f, "OPEN"),
            Self::HalfOpen => write!(f, "HALF_OPEN"),
        }
    }
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures required to open the circuit (default: 5).
    pub failure_threshold: u32,
    /// Time to stay open before permitting a trial call (default: 30s).
    pub cooldown: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            cooldown: Duration::from_secs(30),
        }
    }
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    failure_count: u32,
    last_failure_at: Option<Instant>,
    /// Set when entering HALF_OPEN; consumed by the single trial call.
    trial_available: bool,
}

/// Circuit breaker for one downstream service.
#[derive(Debug)]
pub struct CircuitBreaker {
    /// Service name for logging.
    name: String,
    config: CircuitBreakerConfig,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    /// Create a new circuit breaker in the CLOSED state.
    #[must_use]
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                failure_count: 0,
                last_failure_at: None,
                trial_available: false,
            }),
        }
    }

    /// Get the service name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the current state, applying the lazy OPEN → HALF_OPEN
    /// transition when the cooldown has elapsed.
    #[must_use]
    pub fn state(&self) -> CircuitState {
        let mut inner = self.lock();
        self.maybe_enter_half_open(&mut inner);
        inner.state
    }

    /// Try to acquire permission for one call attempt.
    ///
    /// In HALF_OPEN exactly one caller obtains the trial slot; everyone
    /// else is rejected until the trial resolves.
    #[must_use]
    pub fn try_acquire(&self) -> bool {
        let mut inner = self.lock();
        self.maybe_enter_half_open(&mut inner);

        match inner.state {
            CircuitState::Closed => true,
            CircuitState::Open => false,
            CircuitState::HalfOpen => {
                if inner.trial_available {
                    inner.trial_available = false;
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Record a successful call: reset the failure count and close the
    /// circuit if it was HALF_OPEN.
    pub fn record_success(&self) {
        let mut inner = self.lock();
        inner.failure_count = 0;

        if inner.state != CircuitState::Closed {
            let previous = inner.state;
            inner.state = CircuitState::Closed;
            inner.last_failure_at = None;
            inner.trial_available = false;
            tracing::info!(
                service = %self.name,
                from = %previous,
                to = "CLOSED",
                "Circuit breaker closed"
            );
        }
    }

    /// Record a failed call and open the circuit when the consecutive
    /// failure threshold is reached (a HALF_OPEN trial failure reopens
    /// immediately).
    pub fn record_failure(&self) {
        let mut inner = self.lock();
        inner.failure_count += 1;
        inner.last_failure_at = Some(Instant::now());

        let should_open = inner.state == CircuitState::HalfOpen
            || (inner.state == CircuitState::Closed
                && inner.failure_count >= self.config.failure_threshold);

        if should_open && inner.state != CircuitState::Open {
            let previous = inner.state;
            inner.state = CircuitState::Open;
            inner.trial_available = false;
            tracing::warn!(
                service = %self.name,
                from = %previous,
                to = "OPEN",
                failure_count = inner.failure_count,
                "Circuit breaker opened"
            );
        }
    }

    /// Force the circuit open (emergency stop for a misbehaving service).
    pub fn force_open(&self) {
        let mut inner = self.lock();
        if inner.state != CircuitState::Open {
            inner.state = CircuitState::Open;
            inner.last_failure_at = Some(Instant::now());
            inner.trial_available = false;
            tracing::warn!(service = %self.name, "Circuit breaker forced open");
        }
    }

    fn maybe_enter_half_open(&self, inner: &mut BreakerInner) {
        if inner.state == CircuitState::Open
            && let Some(last) = inner.last_failure_at
            && last.elapsed() > self.config.cooldown
        {
            inner.state = CircuitState::HalfOpen;
            inner.trial_available = true;
            tracing::info!(
                service = %self.name,
                from = "OPEN",
                to = "HALF_OPEN",
                "Circuit breaker permitting trial call"
            );
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BreakerInner> {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
