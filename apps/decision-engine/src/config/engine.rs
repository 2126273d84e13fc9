//! Orchestration settings.

use serde::{Deserialize, Serialize};

/// Orchestration settings: which instruments to analyze, which account
/// to trade, and how often a cycle runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Instruments analyzed each cycle.
    pub instruments: Vec<String>,
    /// Account orders are submitted against.
    pub account_id: i64,
    /// Seconds between orchestration cycles.
    #[serde(default = "default_cycle_interval")]
    pub cycle_interval_secs: u64,
    /// Run a learning round trip after every N cycles (0 disables).
    #[serde(default = "default_learning_interval")]
    pub learning_interval_cycles: u32,
}

const fn default_cycle_interval() -> u64 {
    300
}

const fn default_learning_interval() -> u32 {
    0
}
