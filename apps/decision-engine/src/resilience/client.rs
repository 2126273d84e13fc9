//! Resilient client for one downstream service.
//!
//! Combines the retry policy and the circuit breaker over a mockable
//! [`Transport`], so one logical `call` either returns a response or a
//! single failure signal — callers never see retry mechanics.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use super::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
use super::retry::{ExponentialBackoff, RetryPolicy, is_retryable_status};

/// HTTP method for a transport request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    /// GET request.
    Get,
    /// POST request.
    Post,
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
        }
    }
}

/// One attempt handed to the transport.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    /// HTTP method.
    pub method: HttpMethod,
    /// Full request URL.
    pub url: String,
    /// Correlation id attached as `X-Correlation-ID`.
    pub correlation_id: String,
    /// Optional `Idempotency-Key` header value.
    pub idempotency_key: Option<String>,
    /// Optional JSON body.
    pub body: Option<Value>,
}

/// Raw transport response before any retry/error triage.
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body.
    pub body: String,
}

/// Transport-level failures. All variants are retryable.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The request exceeded its timeout.
    #[error("request timed out")]
    Timeout,
    /// Connection could not be established or was dropped.
    #[error("connection error: {0}")]
    Connect(String),
}

/// The HTTP send seam, separated from retry/circuit-breaker logic so the
/// resilience loop is testable without any network.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform a single request attempt.
    async fn send(&self, request: TransportRequest) -> Result<RawResponse, TransportError>;
}

/// Production transport backed by `reqwest` with a per-call timeout.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build a transport with the given per-request timeout.
    pub fn new(timeout: Duration) -> Result<Self, CallError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CallError::Transport(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: TransportRequest) -> Result<RawResponse, TransportError> {
        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Post => self.client.post(&request.url),
        };

        builder = builder.header("X-Correlation-ID", &request.correlation_id);
        if let Some(key) = &request.idempotency_key {
            builder = builder.header("Idempotency-Key", key);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout
            } else {
                TransportError::Connect(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        Ok(RawResponse { status, body })
    }
}

/// Successful response from a resilient call.
#[derive(Debug, Clone)]
pub struct ServiceResponse {
    /// HTTP status code (always 2xx).
    pub status: u16,
    /// Response body.
    pub body: String,
}

impl ServiceResponse {
    /// Deserialize the JSON body.
    pub fn json<T: DeserializeOwned>(&self, service: &str) -> Result<T, CallError> {
        serde_json::from_str(&self.body).map_err(|source| CallError::Decode {
            service: service.to_string(),
            source,
        })
    }
}

/// Failures surfaced to callers of [`ResilientClient::call`].
#[derive(Debug, Error)]
pub enum CallError {
    /// Circuit open or retries exhausted; callers degrade, not crash.
    #[error("service `{service}` unavailable, correlation_id={correlation_id}")]
    Unavailable {
        /// Downstream service name.
        service: String,
        /// Correlation id of the failed logical call.
        correlation_id: String,
    },
    /// Terminal client error (4xx); not retried, does not trip the circuit.
    #[error("service `{service}` rejected the request with status {status}")]
    Rejected {
        /// Downstream service name.
        service: String,
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },
    /// Response body could not be decoded.
    #[error("failed to decode response from `{service}`: {source}")]
    Decode {
        /// Downstream service name.
        service: String,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
    /// Transport construction failed.
    #[error("transport error: {0}")]
    Transport(String),
}

/// A retrying, circuit-broken client for one downstream base address.
///
/// The circuit breaker is the only state shared across concurrent
/// cycles; it serializes its own updates, so one client instance may be
/// used from many tasks.
pub struct ResilientClient {
    service: String,
    base_url: String,
    transport: Arc<dyn Transport>,
    retry: RetryPolicy,
    breaker: CircuitBreaker,
}

impl ResilientClient {
    /// Create a client for one downstream service.
    #[must_use]
    pub fn new(
        service: impl Into<String>,
        base_url: impl Into<String>,
        transport: Arc<dyn Transport>,
        retry: RetryPolicy,
        breaker_config: CircuitBreakerConfig,
    ) -> Self {
        let service = service.into();
        let breaker = CircuitBreaker::new(service.clone(), breaker_config);
        Self {
            service,
            base_url: base_url.into(),
            transport,
            retry,
            breaker,
        }
    }

    /// Downstream service name.
    #[must_use]
    pub fn service(&self) -> &str {
        &self.service
    }

    /// The circuit breaker owned by this client.
    #[must_use]
    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// POST a JSON body to `path`.
    pub async fn post(
        &self,
        path: &str,
        correlation_id: &str,
        body: &Value,
    ) -> Result<ServiceResponse, CallError> {
        self.execute(HttpMethod::Post, path, correlation_id, None, Some(body))
            .await
    }

    /// POST with an `Idempotency-Key` header.
    pub async fn post_idempotent(
        &self,
        path: &str,
        correlation_id: &str,
        idempotency_key: &str,
        body: &Value,
    ) -> Result<ServiceResponse, CallError> {
        self.execute(
            HttpMethod::Post,
            path,
            correlation_id,
            Some(idempotency_key),
            Some(body),
        )
        .await
    }

    /// GET `path`.
    pub async fn get(
        &self,
        path: &str,
        correlation_id: &str,
    ) -> Result<ServiceResponse, CallError> {
        self.execute(HttpMethod::Get, path, correlation_id, None, None)
            .await
    }

    /// Make one logical call with retry and circuit breaking.
    pub async fn call(
        &self,
        method: HttpMethod,
        path: &str,
        correlation_id: &str,
        body: Option<&Value>,
    ) -> Result<ServiceResponse, CallError> {
        self.execute(method, path, correlation_id, None, body).await
    }

    /// Retry loop shared by all call variants.
    ///
    /// Failure triage: timeouts, connection errors, and 5xx responses
    /// are retryable and advance the circuit breaker toward OPEN; 4xx
    /// responses are terminal and do not count toward circuit failures
    /// (a bad request says nothing about service availability).
    async fn execute(
        &self,
        method: HttpMethod,
        path: &str,
        correlation_id: &str,
        idempotency_key: Option<&str>,
        body: Option<&Value>,
    ) -> Result<ServiceResponse, CallError> {
        if !self.breaker.try_acquire() {
            tracing::warn!(
                service = %self.service,
                correlation_id,
                "Circuit breaker open, rejecting call without attempt"
            );
            return Err(self.unavailable(correlation_id));
        }

        let url = format!("{}{}", self.base_url, path);
        let request = TransportRequest {
            method,
            url: url.clone(),
            correlation_id: correlation_id.to_string(),
            idempotency_key: idempotency_key.map(str::to_string),
            body: body.cloned(),
        };

        let mut backoff = ExponentialBackoff::new(&self.retry);

        loop {
            tracing::debug!(
                service = %self.service,
                %method,
                url = %url,
                attempt = backoff.attempt() + 1,
                max_retries = self.retry.max_retries,
                correlation_id,
                "Calling downstream service"
            );

            match self.transport.send(request.clone()).await {
                Ok(response) if (200..300).contains(&response.status) => {
                    self.breaker.record_success();
                    return Ok(ServiceResponse {
                        status: response.status,
                        body: response.body,
                    });
                }
                Ok(response) if !is_retryable_status(response.status) => {
                    tracing::error!(
                        service = %self.service,
                        status = response.status,
                        correlation_id,
                        "Client error, not retrying"
                    );
                    return Err(CallError::Rejected {
                        service: self.service.clone(),
                        status: response.status,
                        body: response.body,
                    });
                }
                Ok(response) => {
                    tracing::warn!(
                        service = %self.service,
                        status = response.status,
                        correlation_id,
                        "Server error from downstream service"
                    );
                    self.breaker.record_failure();
                }
                Err(error) => {
                    tracing::warn!(
                        service = %self.service,
                        %error,
                        correlation_id,
                        "Transport failure"
                    );
                    self.breaker.record_failure();
                }
            }

            // The breaker may have tripped on this failure; stop retrying
            // so concurrent callers fail fast too.
            if self.breaker.state() == CircuitState::Open {
                return Err(self.unavailable(correlation_id));
            }

            match backoff.next_backoff() {
                Some(delay) => {
                    tracing::debug!(
                        service = %self.service,
                        delay_ms = delay.as_millis(),
                        correlation_id,
                        "Backing off before retry"
                    );
                    tokio::time::sleep(delay).await;
                }
                None => {
                    return Err(self.unavailable(correlation_id));
                }
            }
        }
    }

    fn unavailable(&self, correlation_id: &str) -> CallError {
        CallError::Unavailable {
            service: self.service.clone(),
            correlation_id: correlation_id.to_string(),
        }
    }
}

impl std::fmt::Debug for ResilientClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResilientClient")
            .field("service", &self.service)
            .field("base_url", &self.base_url)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok_response() -> RawResponse {
        RawResponse {
            status: 200,
            body: "{\"ok\":true}".to_string(),
        }
    }

    fn fast_retry(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            backoff_factor: Duration::from_millis(1),
            max_backoff: Duration::from_millis(5),
            jitter_factor: 0.0,
        }
    }

    fn client(transport: MockTransport, retry: RetryPolicy, threshold: u32) -> ResilientClient {
        ResilientClient::new(
            "agent",
            "http://agent.test",
            Arc::new(transport),
            retry,
            CircuitBreakerConfig {
                failure_threshold: threshold,
                cooldown: Duration::from_millis(20),
            },
        )
    }

    #[tokio::test]
    async fn test_success_on_first_attempt() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .times(1)
            .returning(|_| Ok(ok_response()));

        let client = client(transport, fast_retry(3), 5);
        let response = client.get("/analyze", "corr-1").await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(client.breaker().state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_retries_transient_failures_then_succeeds() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .times(2)
            .returning(|_| Err(TransportError::Timeout));
        transport
            .expect_send()
            .times(1)
            .returning(|_| Ok(ok_response()));

        let client = client(transport, fast_retry(3), 5);
        let response = client.get("/analyze", "corr-2").await.unwrap();
        assert_eq!(response.status, 200);
        // Success resets the consecutive failure count
        assert_eq!(client.breaker().state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_exhausted_retries_surface_unavailable() {
        let mut transport = MockTransport::new();
        transport.expect_send().times(3).returning(|_| {
            Ok(RawResponse {
                status: 503,
                body: String::new(),
            })
        });

        let client = client(transport, fast_retry(3), 10);
        let error = client.get("/analyze", "corr-3").await.unwrap_err();
        assert!(matches!(error, CallError::Unavailable { .. }));
    }

    #[tokio::test]
    async fn test_client_error_is_terminal_and_not_counted() {
        let mut transport = MockTransport::new();
        transport.expect_send().times(1).returning(|_| {
            Ok(RawResponse {
                status: 422,
                body: "{\"detail\":\"bad ticker\"}".to_string(),
            })
        });

        let client = client(transport, fast_retry(3), 1);
        let error = client.get("/analyze", "corr-4").await.unwrap_err();
        assert!(matches!(error, CallError::Rejected { status: 422, .. }));
        // A 4xx never trips the circuit, even with threshold 1
        assert_eq!(client.breaker().state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_open_circuit_rejects_without_network_attempt() {
        let mut transport = MockTransport::new();
        // Exactly 2 attempts: the threshold is reached mid-call and the
        // retry loop stops; the second logical call must not touch the
        // transport at all.
        transport
            .expect_send()
            .times(2)
            .returning(|_| Err(TransportError::Connect("refused".to_string())));

        let client = client(transport, fast_retry(5), 2);

        let error = client.get("/analyze", "corr-5").await.unwrap_err();
        assert!(matches!(error, CallError::Unavailable { .. }));
        assert_eq!(client.breaker().state(), CircuitState::Open);

        let error = client.get("/analyze", "corr-6").await.unwrap_err();
        assert!(matches!(error, CallError::Unavailable { .. }));
        // MockTransport verifies the call count on drop
    }

    #[tokio::test]
    async fn test_half_open_trial_success_closes_circuit() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .times(1)
            .returning(|_| Err(TransportError::Timeout));
        transport
            .expect_send()
            .times(1)
            .returning(|_| Ok(ok_response()));

        let client = client(transport, fast_retry(1), 1);

        let error = client.get("/analyze", "corr-7").await.unwrap_err();
        assert!(matches!(error, CallError::Unavailable { .. }));
        assert_eq!(client.breaker().state(), CircuitState::Open);

        // Wait out the cooldown, then the single trial call succeeds
        tokio::time::sleep(Duration::from_millis(30)).await;
        let response = client.get("/analyze", "corr-8").await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(client.breaker().state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_idempotency_key_is_forwarded() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .withf(|req| {
                req.idempotency_key.as_deref() == Some("order-123")
                    && req.correlation_id == "corr-9"
            })
            .times(1)
            .returning(|_| Ok(ok_response()));

        let client = client(transport, fast_retry(3), 5);
        let body = serde_json::json!({"quantity": 10});
        client
            .post_idempotent("/execute", "corr-9", "order-123", &body)
            .await
            .unwrap();
    }

    #[test]
    fn test_response_json_decode_error() {
        let response = ServiceResponse {
            status: 200,
            body: "not json".to_string(),
        };
        let result: Result<serde_json::Value, _> = response.json("agent");
        assert!(matches!(result, Err(CallError::Decode { .. })));
    }
}
