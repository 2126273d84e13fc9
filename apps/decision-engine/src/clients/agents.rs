//! Client for one downstream analysis agent.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::models::{Signal, SignalAction};
use crate::resilience::{CallError, ResilientClient};

/// Wire shape of an agent's `/analyze` response.
#[derive(Debug, Deserialize)]
struct AnalyzeResponse {
    action: SignalAction,
    confidence_score: f64,
    #[serde(default)]
    current_price: Option<Decimal>,
    #[serde(default)]
    indicators: BTreeMap<String, Value>,
}

/// One analysis agent behind a resilient client. The agent's signal
/// class is fixed by configuration, not by the response payload.
#[derive(Debug)]
pub struct AnalysisAgentClient {
    class: String,
    client: ResilientClient,
}

impl AnalysisAgentClient {
    /// Wrap a resilient client for one agent producing `class` signals.
    #[must_use]
    pub fn new(class: impl Into<String>, client: ResilientClient) -> Self {
        Self {
            class: class.into(),
            client,
        }
    }

    /// Signal class this agent produces.
    #[must_use]
    pub fn class(&self) -> &str {
        &self.class
    }

    /// Service name, for logging and degraded-verdict reporting.
    #[must_use]
    pub fn name(&self) -> &str {
        self.client.service()
    }

    /// Request one signal for `instrument_id`.
    ///
    /// A `stop_loss` indicator, when present, becomes the signal's stop
    /// hint; all indicators are carried along in the signal extras for
    /// downstream consumers (e.g. the ATR stop candidate).
    pub async fn analyze(
        &self,
        instrument_id: &str,
        correlation_id: &str,
    ) -> Result<Signal, CallError> {
        let body = json!({ "instrument_id": instrument_id });
        let response = self.client.post("/analyze", correlation_id, &body).await?;
        let parsed: AnalyzeResponse = response.json(self.client.service())?;

        let stop_loss_hint = decimal_indicator(&parsed.indicators, "stop_loss");

        let mut signal = Signal::new(
            instrument_id,
            &self.class,
            parsed.action,
            parsed.confidence_score,
        );
        signal.current_price = parsed.current_price;
        signal.stop_loss_hint = stop_loss_hint;
        signal.extras = parsed.indicators;
        Ok(signal)
    }
}

/// Parse a numeric indicator into a `Decimal`, tolerating absence or a
/// non-numeric value.
pub(crate) fn decimal_indicator(
    indicators: &BTreeMap<String, Value>,
    key: &str,
) -> Option<Decimal> {
    indicators
        .get(key)
        .and_then(|value| serde_json::from_value(value.clone()).ok())
}
