//! Risk decision types produced by the assessor and allocator.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Concrete trade action being assessed or executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeAction {
    /// Open or add to a long position.
    Buy,
    /// Close an existing long position.
    Sell,
    /// Open or add to a short position.
    Short,
    /// Close an existing short position.
    Cover,
}

impl TradeAction {
    /// Whether this action opens new exposure (buy/short) rather than
    /// closing existing exposure (sell/cover).
    #[must_use]
    pub const fn is_opening(self) -> bool {
        matches!(self, Self::Buy | Self::Short)
    }
}

impl std::fmt::Display for TradeAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buy => write!(f, "buy"),
            Self::Sell => write!(f, "sell"),
            Self::Short => write!(f, "short"),
            Self::Cover => write!(f, "cover"),
        }
    }
}

/// The outcome of assessing one proposed trade.
///
/// Decisions are immutable once emitted by the allocator; rejections are
/// data (`approved = false` with a reason), never errors. An unapproved
/// decision always carries `position_size = 0`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskDecision {
    /// Instrument this decision refers to.
    pub instrument_id: String,
    /// Assessed trade action.
    pub action: TradeAction,
    /// Whether the trade may proceed.
    pub approved: bool,
    /// Human-readable approval/rejection/scaling reason.
    pub reason: String,
    /// Number of units to trade (0 when rejected).
    pub position_size: u64,
    /// Entry price used for sizing (zero for closing actions, which
    /// execute at market against the existing position).
    pub entry_price: Decimal,
    /// Final stop-loss price for opening actions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_loss: Option<Decimal>,
    /// Take-profit price, when supplied or derived.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub take_profit: Option<Decimal>,
    /// Reward per unit of risk, when a take-profit exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_reward_ratio: Option<Decimal>,
    /// Capital lost if the stop is hit (zero for closing actions).
    pub risk_amount: Decimal,
}

impl RiskDecision {
    /// Build a rejected decision with a reason.
    #[must_use]
    pub fn rejected(
        instrument_id: impl Into<String>,
        action: TradeAction,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            instrument_id: instrument_id.into(),
            action,
            approved: false,
            reason: reason.into(),
            position_size: 0,
            entry_price: Decimal::ZERO,
            stop_loss: None,
            take_profit: None,
            risk_reward_ratio: None,
            risk_amount: Decimal::ZERO,
        }
    }

    /// Notional value of the proposed trade at the entry price.
    #[must_use]
    pub fn notional(&self) -> Decimal {
        Decimal::from(self.position_size) * self.entry_price
    }
}
