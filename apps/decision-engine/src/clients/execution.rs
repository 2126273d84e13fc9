//! Client for the trade execution service.

use crate::models::{OrderRequest, OrderResponse};
use crate::resilience::{CallError, ResilientClient};

/// Order submission behind a resilient client. Submissions are
/// idempotent downstream, keyed by the order's `client_order_id`, so a
/// retried request can never double-fill.
#[derive(Debug)]
pub struct ExecutionClient {
    client: ResilientClient,
}

impl ExecutionClient {
    /// Wrap a resilient client for the execution service.
    #[must_use]
    pub fn new(client: ResilientClient) -> Self {
        Self {
            client,
        }
    }

    /// Submit one order.
    pub async fn submit(
        &self,
        order: &OrderRequest,
        correlation_id: &str,
    ) -> Result<OrderResponse, CallError> {
        let body =
            serde_json::to_value(order).map_err(|e| CallError::Transport(e.to_string()))?;
        let response = self
            .client
            .post_idempotent("/execute", correlation_id, &order.client_order_id, &body)
            .await?;
        response.json(self.client.service())
    }
}
