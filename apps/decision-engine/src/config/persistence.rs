//! State persistence configuration.

use serde::{Deserialize, Serialize};

/// Locations for policy state and risk-decision audit history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Directory holding policy overrides and the mutation history.
    #[serde(default = "default_policy_dir")]
    pub policy_dir: String,
    /// Directory the risk assessor appends its audit files into.
    #[serde(default = "default_audit_dir")]
    pub audit_dir: String,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            policy_dir: default_policy_dir(),
            audit_dir: default_audit_dir(),
        }
    }
}

fn default_policy_dir() -> String {
    "./data/policy".to_string()
}

fn default_audit_dir() -> String {
    "./data/audit".to_string()
}
