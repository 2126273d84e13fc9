//! Portfolio-level trade admission.
//!
//! Takes the full batch of tradable verdicts for one cycle and runs
//! greedy, priority-ordered admission against two shared constraints: a
//! per-cycle risk budget and a total-exposure ceiling. Closing trades
//! are processed first (they free capital and exposure), then opening
//! trades in descending confidence order.
//!
//! The pass is single-shot and deterministic, not globally optimal:
//! every rejection or scaling carries a human-readable reason, and the
//! output always contains exactly one decision per input candidate.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::models::{AccountBalance, Position, RiskDecision, TradeAction, Verdict, VerdictAction};

use super::assessor::{AssessmentRequest, AssessorPolicy, TradeRiskAssessor};

/// One tradable verdict plus the market context its stops derive from.
#[derive(Debug, Clone)]
pub struct TradeCandidate {
    /// Fused verdict driving the trade.
    pub verdict: Verdict,
    /// Entry price used for sizing and stop derivation.
    pub entry_price: Decimal,
    /// Technical-indicator stop candidate, if an agent reported one.
    pub technical_stop: Option<Decimal>,
    /// Average true range for the volatility stop candidate.
    pub atr: Option<Decimal>,
}

/// Shared-budget parameters for one allocation pass.
#[derive(Debug, Clone)]
pub struct AllocatorPolicy {
    /// Fraction of cash risked across all new trades in one cycle.
    pub per_cycle_risk_budget: Decimal,
    /// Ceiling on total exposure as a fraction of cash.
    pub max_total_exposure: Decimal,
    /// Smallest admissible notional after budget scaling.
    pub min_position_value: Decimal,
    /// Open short positions on bearish verdicts with no long to sell.
    pub enable_short: bool,
    /// Per-trade assessment parameters.
    pub assessor: AssessorPolicy,
}

/// Greedy admission controller over the per-trade assessor.
#[derive(Debug, Clone)]
pub struct PortfolioAllocator {
    assessor: TradeRiskAssessor,
}

impl PortfolioAllocator {
    /// Create an allocator over the given per-trade assessor.
    #[must_use]
    pub fn new(assessor: TradeRiskAssessor) -> Self {
        Self {
            assessor,
        }
    }

    /// Admit, scale, or reject every candidate against the shared
    /// budget and exposure ceiling.
    #[must_use]
    pub fn allocate(
        &self,
        policy: &AllocatorPolicy,
        candidates: Vec<TradeCandidate>,
        balance: &AccountBalance,
        positions: &[Position],
    ) -> Vec<RiskDecision> {
        let held: BTreeMap<&str, &Position> = positions
            .iter()
            .map(|position| (position.instrument_id.as_str(), position))
            .collect();
        let position_size =
            |instrument: &str| held.get(instrument).map_or(0, |position| position.quantity);

        let mut remaining_budget = balance.cash_balance * policy.per_cycle_risk_budget;
        let exposure_ceiling = balance.cash_balance * policy.max_total_exposure;
        let mut current_exposure: Decimal = positions
            .iter()
            .map(|position| position.market_value().abs())
            .sum();
        let mut admitted_buys_value = Decimal::ZERO;

        let mut closing = Vec::new();
        let mut opening = Vec::new();
        let mut decisions = Vec::with_capacity(candidates.len());

        for candidate in candidates {
            let current = position_size(&candidate.verdict.instrument_id);
            match trade_action_for(&candidate.verdict, current, policy.enable_short) {
                None => decisions.push(RiskDecision::rejected(
                    &candidate.verdict.instrument_id,
                    TradeAction::Buy,
                    &format!("{} verdicts are not tradable.", candidate.verdict.action),
                )),
                Some(action) if action.is_opening() => opening.push((candidate, action)),
                Some(action) => closing.push((candidate, action)),
            }
        }

        // Closing trades run first so freed exposure is available to the
        // opening trades admitted below.
        for (candidate, action) in closing {
            let current = position_size(&candidate.verdict.instrument_id);
            let request = request_for(&candidate, action, balance, current);
            let decision = self.assessor.assess(&policy.assessor, &request);
            if decision.approved
                && let Some(position) = held.get(candidate.verdict.instrument_id.as_str())
            {
                current_exposure -= position.market_value().abs();
            }
            decisions.push(decision);
        }

        opening.sort_by(|(a, _), (b, _)| {
            b.verdict
                .confidence()
                .partial_cmp(&a.verdict.confidence())
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.verdict.instrument_id.cmp(&b.verdict.instrument_id))
        });

        for (candidate, action) in opening {
            let current = position_size(&candidate.verdict.instrument_id);
            let request = request_for(&candidate, action, balance, current);
            let mut decision = self.assessor.assess(&policy.assessor, &request);
            if !decision.approved {
                decisions.push(decision);
                continue;
            }

            if decision.risk_amount > remaining_budget {
                let scale = remaining_budget / decision.risk_amount;
                let scaled_size = (Decimal::from(decision.position_size) * scale)
                    .floor()
                    .to_u64()
                    .unwrap_or(0);
                let scaled_value = Decimal::from(scaled_size) * decision.entry_price;
                if scaled_size == 0 || scaled_value < policy.min_position_value {
                    reject_in_place(
                        &mut decision,
                        &format!(
                            "Scaled position value {scaled_value} is below minimum position value {}.",
                            policy.min_position_value
                        ),
                    );
                    decisions.push(decision);
                    continue;
                }
                decision.position_size = scaled_size;
                decision.risk_amount = remaining_budget;
                decision.reason = "Position scaled down to fit risk budget.".to_string();
            }

            let trade_value = decision.notional();
            if current_exposure + admitted_buys_value + trade_value > exposure_ceiling {
                reject_in_place(
                    &mut decision,
                    "Trade exceeds max total portfolio exposure limit.",
                );
                decisions.push(decision);
                continue;
            }

            remaining_budget -= decision.risk_amount;
            admitted_buys_value += trade_value;
            decisions.push(decision);
        }

        tracing::info!(
            total = decisions.len(),
            approved = decisions.iter().filter(|d| d.approved).count(),
            remaining_budget = %remaining_budget,
            "Allocation pass complete"
        );
        decisions
    }

}

fn request_for(
    candidate: &TradeCandidate,
    action: TradeAction,
    balance: &AccountBalance,
    current_position: i64,
) -> AssessmentRequest {
    let mut request = AssessmentRequest::new(
        &candidate.verdict.instrument_id,
        action,
        balance.cash_balance,
        candidate.entry_price,
    );
    request.technical_stop = candidate.technical_stop;
    request.atr = candidate.atr;
    request.current_position = current_position;
    request
}

fn reject_in_place(decision: &mut RiskDecision, reason: &str) {
    decision.approved = false;
    decision.reason = reason.to_string();
    decision.position_size = 0;
    decision.risk_amount = Decimal::ZERO;
}

/// Map a verdict to the concrete trade action given the held position.
/// Only plain buy/sell verdicts trade; strong verdicts signal
/// conviction in reports but never place orders.
fn trade_action_for(
    verdict: &Verdict,
    current_position: i64,
    enable_short: bool,
) -> Option<TradeAction> {
    match verdict.action {
        VerdictAction::Buy => Some(if current_position < 0 {
            TradeAction::Cover
        } else {
            TradeAction::Buy
        }),
        VerdictAction::Sell => {
            if current_position > 0 {
                Some(TradeAction::Sell)
            } else if enable_short {
                Some(TradeAction::Short)
            } else {
                // Assessor rejects with "no existing position to sell"
                Some(TradeAction::Sell)
            }
        }
        VerdictAction::Hold | VerdictAction::StrongBuy | VerdictAction::StrongSell => None,
    }
}
