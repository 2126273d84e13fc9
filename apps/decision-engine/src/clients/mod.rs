//! Typed clients for the downstream collaborator services, all built on
//! the resilient call layer.

mod agents;
mod execution;
mod ledger;
mod learning;

pub use agents::AnalysisAgentClient;
pub use execution::ExecutionClient;
pub use ledger::LedgerClient;
pub use learning::{LearningClient, LearningRequest};

pub(crate) use agents::decimal_indicator;
