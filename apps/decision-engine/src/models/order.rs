//! Execution sink order types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::decision::TradeAction;

/// Order submission request for the execution service.
///
/// Idempotent via `client_order_id`: resubmitting the same id must not
/// create a second order downstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
    /// Instrument to trade.
    pub instrument_id: String,
    /// Trade side.
    pub side: TradeAction,
    /// Quantity to trade.
    pub quantity: u64,
    /// Reference price (the sizing entry price).
    pub price: Decimal,
    /// Caller-generated idempotency key.
    pub client_order_id: String,
    /// Account to trade against.
    pub account_id: i64,
}

/// Terminal and intermediate order states reported by the execution
/// service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Accepted, not yet routed.
    Pending,
    /// Routed to the venue.
    Placed,
    /// Filled.
    Executed,
    /// Rejected or errored downstream.
    Failed,
    /// Cancelled before execution.
    Cancelled,
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Placed => write!(f, "placed"),
            Self::Executed => write!(f, "executed"),
            Self::Failed => write!(f, "failed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Execution service response for a submitted order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderResponse {
    /// Downstream order identifier.
    pub order_id: String,
    /// Reported order status.
    pub status: OrderStatus,
    /// Failure/rejection detail, when any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}
