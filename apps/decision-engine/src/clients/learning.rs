//! Client for the learning service.
//!
//! The learning round trip sends recent trade history, price history,
//! and the current policy snapshot; the service answers with bounded
//! policy deltas the store applies (see the policy module).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::{PriceBar, Trade};
use crate::policy::{PolicyDelta, PolicySnapshot};
use crate::resilience::{CallError, ResilientClient};

/// Payload for `POST /learn`.
#[derive(Debug, Serialize)]
pub struct LearningRequest {
    /// Recently executed trades.
    pub trade_history: Vec<Trade>,
    /// Price bars per instrument.
    pub price_history: BTreeMap<String, Vec<PriceBar>>,
    /// The policy the deltas will apply against.
    pub current_policy: PolicySnapshot,
}

/// Wire shape of the learning response.
#[derive(Debug, Deserialize)]
struct LearningResponse {
    #[serde(default)]
    policy_deltas: PolicyDelta,
    #[serde(default)]
    reasoning: Vec<String>,
}

/// Learning service behind a resilient client.
#[derive(Debug)]
pub struct LearningClient {
    client: ResilientClient,
}

impl LearningClient {
    /// Wrap a resilient client for the learning service.
    #[must_use]
    pub fn new(client: ResilientClient) -> Self {
        Self {
            client,
        }
    }

    /// Run one learning round trip and return the proposed deltas.
    pub async fn learn(
        &self,
        request: &LearningRequest,
        correlation_id: &str,
    ) -> Result<PolicyDelta, CallError> {
        let body =
            serde_json::to_value(request).map_err(|e| CallError::Transport(e.to_string()))?;
        let response = self.client.post("/learn", correlation_id, &body).await?;
        let parsed: LearningResponse = response.json(self.client.service())?;

        if !parsed.reasoning.is_empty() {
            tracing::info!(reasoning = ?parsed.reasoning, "Learning service reasoning");
        }
        Ok(parsed.policy_deltas)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::{CircuitBreakerConfig, HttpTransport, RetryPolicy};
    use rust_decimal_macros::dec;
    use std::sync::Arc;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn learning(base_url: &str) -> LearningClient {
        let transport = HttpTransport::new(Duration::from_secs(2)).unwrap();
        LearningClient::new(ResilientClient::new(
            "learning",
            base_url,
            Arc::new(transport),
            RetryPolicy::default(),
            CircuitBreakerConfig::default(),
        ))
    }

    #[tokio::test]
    async fn test_learn_returns_policy_deltas() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/learn"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "learning_state": "learning",
                "policy_deltas": {
                    "risk_per_trade": "0.002",
                    "agent_weights": {"technical": 0.1}
                },
                "reasoning": ["technical agent outperformed"]
            })))
            .mount(&server)
            .await;

        let request = LearningRequest {
            trade_history: vec![],
            price_history: BTreeMap::new(),
            current_policy: PolicySnapshot::default(),
        };
        let delta = learning(&server.uri()).learn(&request, "corr-1").await.unwrap();

        assert_eq!(delta.risk_per_trade, Some(dec!(0.002)));
        assert_eq!(delta.agent_weights.get("technical"), Some(&0.1));
    }

    #[tokio::test]
    async fn test_learn_with_empty_deltas() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/learn"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"learning_state": "warmup"})),
            )
            .mount(&server)
            .await;

        let request = LearningRequest {
            trade_history: vec![],
            price_history: BTreeMap::new(),
            current_policy: PolicySnapshot::default(),
        };
        let delta = learning(&server.uri()).learn(&request, "corr-2").await.unwrap();

        assert!(delta.is_empty());
    }
}
