//! Per-cycle batch reports.
//!
//! A cycle report always enumerates every requested instrument with its
//! own status; a subset of misbehaving instruments or agents never fails
//! the whole batch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::decision::RiskDecision;
use super::order::OrderStatus;
use super::signal::Verdict;

/// Analysis status for one instrument within a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstrumentStatus {
    /// Every analysis agent responded.
    Complete,
    /// At least one agent responded; the verdict is degraded.
    Partial,
    /// No agent responded; excluded from allocation.
    Error,
}

/// Per-instrument analysis outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentReport {
    /// Instrument identifier.
    pub instrument_id: String,
    /// Analysis status.
    pub status: InstrumentStatus,
    /// Fused verdict, absent when every agent failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verdict: Option<Verdict>,
    /// Failure detail for `Error` status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Terminal submission outcome for one admitted decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum SubmissionOutcome {
    /// Order accepted by the execution service.
    Submitted {
        /// Downstream order identifier.
        order_id: String,
        /// Reported status.
        status: OrderStatus,
    },
    /// Submission failed (service unavailable or order rejected).
    Failed {
        /// Failure detail.
        reason: String,
    },
}

/// One admitted decision paired with its terminal submission outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionReport {
    /// The admitted decision.
    pub decision: RiskDecision,
    /// What happened when it was submitted.
    pub outcome: SubmissionOutcome,
}

/// Full result of one orchestration cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleReport {
    /// Unique cycle identifier (also the correlation id root).
    pub cycle_id: String,
    /// Cycle start time.
    pub started_at: DateTime<Utc>,
    /// One entry per requested instrument, in request order.
    pub instruments: Vec<InstrumentReport>,
    /// Every allocator decision for the cycle (admitted and rejected).
    pub decisions: Vec<RiskDecision>,
    /// Submission outcomes for admitted decisions.
    pub executions: Vec<ExecutionReport>,
}
