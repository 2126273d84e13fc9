//! Downstream service endpoints.

use serde::{Deserialize, Serialize};

/// One analysis agent endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentServiceConfig {
    /// Service name used in logs and circuit breaker identification.
    pub name: String,
    /// Signal class this agent produces (e.g. "technical").
    pub class: String,
    /// Base URL of the agent service.
    pub base_url: String,
}

/// Endpoints for all downstream collaborators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServicesConfig {
    /// Analysis agents queried concurrently per instrument.
    pub agents: Vec<AgentServiceConfig>,
    /// Trade execution service.
    pub execution_url: String,
    /// Account/position ledger service.
    pub ledger_url: String,
    /// Learning service; absent disables the learning round trip.
    #[serde(default)]
    pub learning_url: Option<String>,
    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

const fn default_request_timeout() -> u64 {
    10
}
