//! Error taxonomy for the decision engine.
//!
//! Two failure classes matter to callers:
//!
//! | Class | Meaning | Handling |
//! |-------|---------|----------|
//! | `Call` | Downstream circuit open or retries exhausted | Degrade, never crash |
//! | `Config`/`Policy` | Startup or policy persistence failure | Surface to the operator |
//!
//! An instrument whose every agent signal failed is not an error
//! either: it is reported with an `error` status and excluded from
//! allocation while the rest of the batch proceeds. Likewise,
//! out-of-bounds assessor input is a rejected
//! [`crate::models::RiskDecision`] with a reason string, so a bad
//! candidate can never abort a cycle.

use thiserror::Error;

use crate::config::ConfigError;
use crate::policy::PolicyError;
use crate::resilience::CallError;

/// Top-level engine error.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A downstream call failed after resilience was exhausted.
    #[error(transparent)]
    Call(#[from] CallError),

    /// Configuration could not be loaded or validated.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Policy state could not be persisted or restored.
    #[error(transparent)]
    Policy(#[from] PolicyError),
}
