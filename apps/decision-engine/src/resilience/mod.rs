//! Resilience patterns for downstream service calls.
//!
//! Circuit breaking and retry-with-backoff, composed into a
//! [`ResilientClient`] per downstream base address. The breaker state
//! machine is pure and the transport is a trait, so each piece is
//! testable in isolation.

mod circuit_breaker;
mod client;
mod retry;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use client::{
    CallError, HttpMethod, HttpTransport, RawResponse, ResilientClient, ServiceResponse,
    Transport, TransportError, TransportRequest,
};
pub use retry::{ExponentialBackoff, RetryPolicy, is_retryable_status};
