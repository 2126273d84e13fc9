//! Canonical agent signal and verdict types.
//!
//! Signals are produced by the adapter boundary (one per analysis
//! service per instrument) and are immutable once created. Verdicts are
//! derived per cycle by the synthesizer and never persisted.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use rust_decimal::Decimal;

/// Directional action reported by an analysis agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalAction {
    /// Agent recommends entering/adding.
    Buy,
    /// Agent recommends exiting/reducing.
    Sell,
    /// Agent sees no edge.
    Hold,
}

impl SignalAction {
    /// Numeric contribution used by the synthesizer (buy +1, hold 0, sell -1).
    #[must_use]
    pub const fn value(self) -> f64 {
        match self {
            Self::Buy => 1.0,
            Self::Hold => 0.0,
            Self::Sell => -1.0,
        }
    }
}

impl std::fmt::Display for SignalAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buy => write!(f, "buy"),
            Self::Sell => write!(f, "sell"),
            Self::Hold => write!(f, "hold"),
        }
    }
}

/// A normalized per-agent signal for one instrument.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    /// Instrument this signal refers to.
    pub instrument_id: String,
    /// Signal class used for weight lookup (e.g. "technical", "fundamental").
    pub class: String,
    /// Directional action.
    pub action: SignalAction,
    /// Confidence in [0, 1].
    pub confidence: f64,
    /// Last traded price observed by the agent, when reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_price: Option<Decimal>,
    /// Indicator-derived stop-loss hint, when reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_loss_hint: Option<Decimal>,
    /// Agent-specific indicator values (e.g. "atr", "rsi") carried
    /// along for stop-candidate derivation and reporting.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extras: BTreeMap<String, Value>,
}

impl Signal {
    /// Create a signal with no price or stop metadata.
    #[must_use]
    pub fn new(
        instrument_id: impl Into<String>,
        class: impl Into<String>,
        action: SignalAction,
        confidence: f64,
    ) -> Self {
        Self {
            instrument_id: instrument_id.into(),
            class: class.into(),
            action,
            confidence,
            current_price: None,
            stop_loss_hint: None,
            extras: BTreeMap::new(),
        }
    }
}

/// Final fused action for one instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictAction {
    /// High-conviction buy (score >= 0.8). Reported, not traded.
    StrongBuy,
    /// Buy (score >= 0.2).
    Buy,
    /// No action (score in (-0.2, 0.2)).
    Hold,
    /// Sell (score in (-0.8, -0.2]).
    Sell,
    /// High-conviction sell (score <= -0.8). Reported, not traded.
    StrongSell,
}

impl std::fmt::Display for VerdictAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StrongBuy => write!(f, "strong_buy"),
            Self::Buy => write!(f, "buy"),
            Self::Hold => write!(f, "hold"),
            Self::Sell => write!(f, "sell"),
            Self::StrongSell => write!(f, "strong_sell"),
        }
    }
}

/// Fused verdict for one instrument with its contributing signals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verdict {
    /// Instrument this verdict refers to.
    pub instrument_id: String,
    /// Fused action.
    pub action: VerdictAction,
    /// Weighted score the action was derived from.
    pub score: f64,
    /// Signals that contributed to the score.
    pub signals: Vec<Signal>,
}

impl Verdict {
    /// Mean confidence across contributing signals.
    ///
    /// Used by the allocator to rank buy candidates; an empty signal
    /// set yields 0.
    #[must_use]
    pub fn confidence(&self) -> f64 {
        if self.signals.is_empty() {
            return 0.0;
        }
        let total: f64 = self.signals.iter().map(|s| s.confidence).sum();
        total / self.signals.len() as f64
    }
}
