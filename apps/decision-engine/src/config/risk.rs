//! Risk policy defaults and learning bounds.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::policy::{PolicyBounds, PolicySnapshot};

/// Static risk defaults. These seed the policy store; the learning
/// service adjusts them at runtime within the configured bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Fraction of portfolio value risked per trade.
    #[serde(default = "default_risk_per_trade")]
    pub risk_per_trade: Decimal,
    /// Fixed percentage stop distance from entry.
    #[serde(default = "default_stop_loss_pct")]
    pub stop_loss_pct: Decimal,
    /// Maximum position notional as a fraction of portfolio value.
    #[serde(default = "default_max_position_pct")]
    pub max_position_pct: Decimal,
    /// Ceiling on total exposure as a fraction of cash.
    #[serde(default = "default_max_total_exposure")]
    pub max_total_exposure: Decimal,
    /// Fraction of cash risked across all new trades in one cycle.
    #[serde(default = "default_per_cycle_risk_budget")]
    pub per_cycle_risk_budget: Decimal,
    /// Smallest admissible notional after budget scaling.
    #[serde(default = "default_min_position_value")]
    pub min_position_value: Decimal,
    /// Minimum acceptable risk/reward ratio, if configured.
    #[serde(default)]
    pub min_risk_reward_ratio: Option<Decimal>,
    /// Open short positions on bearish verdicts with no long to sell.
    #[serde(default)]
    pub enable_short: bool,
    /// Consider technical-indicator stop hints as stop candidates.
    #[serde(default = "default_enable_technical_stop")]
    pub enable_technical_stop: bool,
    /// Per-class weights consumed by verdict synthesis.
    #[serde(default = "default_agent_weights")]
    pub agent_weights: BTreeMap<String, f64>,
    /// Lower clamp for learned `risk_per_trade`.
    #[serde(default = "default_min_risk_per_trade")]
    pub min_risk_per_trade: Decimal,
    /// Upper clamp for learned `risk_per_trade`.
    #[serde(default = "default_max_risk_per_trade")]
    pub max_risk_per_trade: Decimal,
    /// Lower clamp for learned `stop_loss_pct`.
    #[serde(default = "default_min_stop_loss_pct")]
    pub min_stop_loss_pct: Decimal,
    /// Upper clamp for learned `stop_loss_pct`.
    #[serde(default = "default_max_stop_loss_pct")]
    pub max_stop_loss_pct: Decimal,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            risk_per_trade: default_risk_per_trade(),
            stop_loss_pct: default_stop_loss_pct(),
            max_position_pct: default_max_position_pct(),
            max_total_exposure: default_max_total_exposure(),
            per_cycle_risk_budget: default_per_cycle_risk_budget(),
            min_position_value: default_min_position_value(),
            min_risk_reward_ratio: None,
            enable_short: false,
            enable_technical_stop: default_enable_technical_stop(),
            agent_weights: default_agent_weights(),
            min_risk_per_trade: default_min_risk_per_trade(),
            max_risk_per_trade: default_max_risk_per_trade(),
            min_stop_loss_pct: default_min_stop_loss_pct(),
            max_stop_loss_pct: default_max_stop_loss_pct(),
        }
    }
}

impl RiskConfig {
    /// Seed the policy store's defaults from this config section.
    #[must_use]
    pub fn policy_defaults(&self) -> PolicySnapshot {
        PolicySnapshot {
            agent_weights: self.agent_weights.clone(),
            instrument_bias: BTreeMap::new(),
            risk_per_trade: self.risk_per_trade,
            stop_loss_pct: self.stop_loss_pct,
            max_position_pct: self.max_position_pct,
            max_total_exposure: self.max_total_exposure,
            per_cycle_risk_budget: self.per_cycle_risk_budget,
            min_position_value: self.min_position_value,
            min_risk_reward_ratio: self.min_risk_reward_ratio,
            enable_short: self.enable_short,
            enable_technical_stop: self.enable_technical_stop,
        }
    }

    #[must_use]
    pub fn policy_bounds(&self) -> PolicyBounds {
        PolicyBounds {
            min_risk_per_trade: self.min_risk_per_trade,
            max_risk_per_trade: self.max_risk_per_trade,
            min_stop_loss_pct: self.min_stop_loss_pct,
            max_stop_loss_pct: self.max_stop_loss_pct,
        }
    }

    pub(super) fn validate(&self) -> Result<(), ConfigError> {
        let fraction = |name: &str, value: Decimal| {
            if value <= Decimal::ZERO || value >= Decimal::ONE {
                Err(ConfigError::ValidationError(format!(
                    "risk.{name} must be between 0 and 1 (exclusive)"
                )))
            } else {
                Ok(())
            }
        };

        fraction("risk_per_trade", self.risk_per_trade)?;
        fraction("stop_loss_pct", self.stop_loss_pct)?;
        fraction("per_cycle_risk_budget", self.per_cycle_risk_budget)?;

        if self.max_position_pct <= Decimal::ZERO || self.max_position_pct > Decimal::ONE {
            return Err(ConfigError::ValidationError(
                "risk.max_position_pct must be between 0 and 1".to_string(),
            ));
        }
        if self.max_total_exposure <= Decimal::ZERO {
            return Err(ConfigError::ValidationError(
                "risk.max_total_exposure must be positive".to_string(),
            ));
        }
        if self.min_risk_per_trade >= self.max_risk_per_trade {
            return Err(ConfigError::ValidationError(
                "risk.min_risk_per_trade must be below risk.max_risk_per_trade".to_string(),
            ));
        }
        if self.min_stop_loss_pct >= self.max_stop_loss_pct {
            return Err(ConfigError::ValidationError(
                "risk.min_stop_loss_pct must be below risk.max_stop_loss_pct".to_string(),
            ));
        }

        Ok(())
    }
}

fn default_risk_per_trade() -> Decimal {
    dec!(0.01)
}

fn default_stop_loss_pct() -> Decimal {
    dec!(0.05)
}

fn default_max_position_pct() -> Decimal {
    dec!(0.20)
}

fn default_max_total_exposure() -> Decimal {
    dec!(0.80)
}

fn default_per_cycle_risk_budget() -> Decimal {
    dec!(0.02)
}

fn default_min_position_value() -> Decimal {
    dec!(1000)
}

fn default_enable_technical_stop() -> bool {
    true
}

fn default_agent_weights() -> BTreeMap<String, f64> {
    BTreeMap::from([
        ("technical".to_string(), 0.5),
        ("fundamental".to_string(), 0.5),
    ])
}

fn default_min_risk_per_trade() -> Decimal {
    dec!(0.001)
}

fn default_max_risk_per_trade() -> Decimal {
    dec!(0.05)
}

fn default_min_stop_loss_pct() -> Decimal {
    dec!(0.01)
}

fn default_max_stop_loss_pct() -> Decimal {
    dec!(0.15)
}
