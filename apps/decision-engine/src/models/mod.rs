//! Canonical domain types shared across the engine.

mod decision;
mod ledger;
mod order;
mod report;
mod signal;

pub use decision::{RiskDecision, TradeAction};
pub use ledger::{AccountBalance, Position, PriceBar, Trade};
pub use order::{OrderRequest, OrderResponse, OrderStatus};
pub use report::{
    CycleReport, ExecutionReport, InstrumentReport, InstrumentStatus, SubmissionOutcome,
};
pub use signal::{Signal, SignalAction, Verdict, VerdictAction};
