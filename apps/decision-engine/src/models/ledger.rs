//! Read-only ledger types: balances, positions, trade history.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::decision::TradeAction;

/// Account cash balance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountBalance {
    /// Available cash.
    pub cash_balance: Decimal,
}

/// An open position reported by the ledger service.
///
/// Quantity is signed: positive for long, negative for short.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    /// Instrument identifier.
    pub instrument_id: String,
    /// Signed quantity held.
    pub quantity: i64,
    /// Average acquisition cost per unit.
    pub average_cost: Decimal,
    /// Latest market price, when the ledger has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_market_price: Option<Decimal>,
}

impl Position {
    /// Price used for exposure math: market price when present,
    /// otherwise average cost.
    #[must_use]
    pub fn mark_price(&self) -> Decimal {
        self.current_market_price.unwrap_or(self.average_cost)
    }

    /// Market value of the position at the mark price.
    #[must_use]
    pub fn market_value(&self) -> Decimal {
        Decimal::from(self.quantity) * self.mark_price()
    }
}

/// A historical executed trade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    /// Instrument identifier.
    pub instrument_id: String,
    /// Side of the executed trade.
    pub side: TradeAction,
    /// Executed quantity.
    pub quantity: u64,
    /// Execution price.
    pub price: Decimal,
    /// Execution time.
    pub executed_at: DateTime<Utc>,
}

/// A single bar of price history handed to the learning service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceBar {
    /// Bar timestamp.
    pub timestamp: DateTime<Utc>,
    /// Closing price.
    pub close: Decimal,
}
