//! Per-instrument trade risk assessment.
//!
//! Converts one directional verdict into a concrete, bounded order
//! proposal: stop-loss selection, position sizing off the capital at
//! risk, an optional risk/reward gate, and a hard cap on position
//! value. Every path returns a [`RiskDecision`] with a human-readable
//! reason; validation failures are rejections, never errors.
//!
//! Closing actions (sell, cover) bypass sizing entirely: they are
//! approved at the full existing position size since closing reduces
//! risk rather than adding it.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal_macros::dec;

use crate::models::{RiskDecision, TradeAction};

use super::audit::AuditLog;

/// Policy parameters governing a single assessment.
#[derive(Debug, Clone)]
pub struct AssessorPolicy {
    /// Fraction of portfolio value risked per trade, in (0, 1).
    pub risk_per_trade: Decimal,
    /// Fixed percentage stop distance from entry, in (0, 1).
    pub stop_loss_pct: Decimal,
    /// Maximum position notional as a fraction of portfolio value, in (0, 1].
    pub max_position_pct: Decimal,
    /// Minimum acceptable risk/reward ratio, if configured.
    pub min_risk_reward_ratio: Option<Decimal>,
    /// Consider technical-indicator stop hints as stop candidates.
    pub enable_technical_stop: bool,
}

impl Default for AssessorPolicy {
    fn default() -> Self {
        Self {
            risk_per_trade: dec!(0.01),
            stop_loss_pct: dec!(0.05),
            max_position_pct: dec!(0.20),
            min_risk_reward_ratio: None,
            enable_technical_stop: true,
        }
    }
}

/// One assessment request: the instrument, the intended action, and the
/// market context the stop candidates are derived from.
#[derive(Debug, Clone)]
pub struct AssessmentRequest {
    /// Instrument being traded.
    pub instrument_id: String,
    /// Intended trade action.
    pub action: TradeAction,
    /// Total portfolio value the risk fraction applies to.
    pub portfolio_value: Decimal,
    pub entry_price: Decimal,
    /// Stop suggested by technical indicators, if any.
    pub technical_stop: Option<Decimal>,
    /// Signed existing position (negative = short).
    pub current_position: i64,
    /// Average true range for the volatility stop candidate.
    pub atr: Option<Decimal>,
    /// ATR multiple for the volatility stop (default 2.5).
    pub atr_multiplier: Decimal,
    /// Explicit take-profit target, if the caller has one.
    pub take_profit: Option<Decimal>,
    /// Derive take-profit as `entry ± risk_per_share * multiplier` when
    /// no explicit target is given.
    pub reward_multiplier: Option<Decimal>,
}

impl AssessmentRequest {
    /// Build a minimal request; optional context defaults to absent.
    #[must_use]
    pub fn new(
        instrument_id: impl Into<String>,
        action: TradeAction,
        portfolio_value: Decimal,
        entry_price: Decimal,
    ) -> Self {
        Self {
            instrument_id: instrument_id.into(),
            action,
            portfolio_value,
            entry_price,
            technical_stop: None,
            current_position: 0,
            atr: None,
            atr_multiplier: dec!(2.5),
            take_profit: None,
            reward_multiplier: None,
        }
    }
}

/// Stateless assessor; carries only the audit sink.
#[derive(Debug, Clone)]
pub struct TradeRiskAssessor {
    audit: AuditLog,
}

impl TradeRiskAssessor {
    /// Create an assessor writing outcomes to `audit`.
    #[must_use]
    pub fn new(audit: AuditLog) -> Self {
        Self {
            audit,
        }
    }

    /// Assess one trade and append the outcome to the audit log.
    #[must_use]
    pub fn assess(&self, policy: &AssessorPolicy, request: &AssessmentRequest) -> RiskDecision {
        let decision = evaluate(policy, request);
        tracing::info!(
            instrument_id = %decision.instrument_id,
            action = %decision.action,
            approved = decision.approved,
            position_size = decision.position_size,
            reason = %decision.reason,
            "Risk assessment"
        );
        self.audit.record(&decision);
        decision
    }
}

fn evaluate(policy: &AssessorPolicy, request: &AssessmentRequest) -> RiskDecision {
    let reject = |reason: &str| {
        RiskDecision::rejected(&request.instrument_id, request.action, reason)
    };

    if request.portfolio_value <= Decimal::ZERO {
        return reject("Portfolio value must be positive.");
    }
    if policy.risk_per_trade <= Decimal::ZERO || policy.risk_per_trade >= Decimal::ONE {
        return reject("Risk per trade must be between 0 and 1 (exclusive).");
    }
    if policy.max_position_pct <= Decimal::ZERO || policy.max_position_pct > Decimal::ONE {
        return reject("Max position percentage must be between 0 and 1.");
    }

    // Closing actions release risk; approve at the full position size.
    match request.action {
        TradeAction::Sell => {
            return if request.current_position > 0 {
                close_decision(
                    request,
                    request.current_position.unsigned_abs(),
                    "Approval to sell existing position.",
                )
            } else {
                reject("No existing position to sell.")
            };
        }
        TradeAction::Cover => {
            return if request.current_position < 0 {
                close_decision(
                    request,
                    request.current_position.unsigned_abs(),
                    "Approval to cover existing short position.",
                )
            } else {
                reject("No existing short position to cover.")
            };
        }
        TradeAction::Buy | TradeAction::Short => {}
    }

    let entry = request.entry_price;
    if entry <= Decimal::ZERO {
        return reject("Entry price must be positive.");
    }

    let Some(stop) = select_stop(policy, request) else {
        return reject("No valid stop-loss candidate on the correct side of entry.");
    };

    let risk_per_share = (entry - stop).abs();
    if risk_per_share <= Decimal::ZERO {
        return reject("Risk per share must be positive.");
    }

    let take_profit = request.take_profit.or_else(|| {
        request.reward_multiplier.map(|multiplier| match request.action {
            TradeAction::Short => entry - risk_per_share * multiplier,
            _ => entry + risk_per_share * multiplier,
        })
    });
    let risk_reward_ratio = take_profit.map(|target| {
        let reward = match request.action {
            TradeAction::Short => entry - target,
            _ => target - entry,
        };
        reward / risk_per_share
    });
    if let (Some(minimum), Some(ratio)) = (policy.min_risk_reward_ratio, risk_reward_ratio)
        && ratio < minimum
    {
        return reject(&format!(
            "Risk/Reward ratio {ratio:.2} is below the minimum {minimum}."
        ));
    }

    let mut risk_amount = request.portfolio_value * policy.risk_per_trade;
    let mut position_size = (risk_amount / risk_per_share)
        .floor()
        .to_u64()
        .unwrap_or(0);
    if position_size == 0 {
        return reject("Calculated position size is zero.");
    }

    let max_position_value = request.portfolio_value * policy.max_position_pct;
    let mut reason = "Trade approved.".to_string();
    if Decimal::from(position_size) * entry > max_position_value {
        position_size = (max_position_value / entry).floor().to_u64().unwrap_or(0);
        if position_size == 0 {
            return reject("Position size after the max-position cap is zero.");
        }
        risk_amount = Decimal::from(position_size) * risk_per_share;
        reason = format!(
            "Position scaled down to respect the max position limit ({}% of portfolio).",
            policy.max_position_pct * dec!(100)
        );
    }

    RiskDecision {
        instrument_id: request.instrument_id.clone(),
        action: request.action,
        approved: true,
        reason,
        position_size,
        entry_price: entry,
        stop_loss: Some(stop),
        take_profit,
        risk_reward_ratio,
        risk_amount,
    }
}

fn close_decision(request: &AssessmentRequest, size: u64, reason: &str) -> RiskDecision {
    RiskDecision {
        instrument_id: request.instrument_id.clone(),
        action: request.action,
        approved: true,
        reason: reason.to_string(),
        position_size: size,
        entry_price: request.entry_price,
        stop_loss: None,
        take_profit: None,
        risk_reward_ratio: None,
        risk_amount: Decimal::ZERO,
    }
}

/// Pick the tightest stop that is still on the correct side of entry.
///
/// For a buy the tightest valid stop is the highest candidate below
/// entry; for a short, the lowest candidate above entry.
fn select_stop(policy: &AssessorPolicy, request: &AssessmentRequest) -> Option<Decimal> {
    let entry = request.entry_price;
    let short = request.action == TradeAction::Short;

    let fixed = if short {
        entry * (Decimal::ONE + policy.stop_loss_pct)
    } else {
        entry * (Decimal::ONE - policy.stop_loss_pct)
    };

    let mut candidates = vec![fixed];
    if policy.enable_technical_stop
        && let Some(technical) = request.technical_stop
    {
        candidates.push(technical);
    }
    if let Some(atr) = request.atr {
        let distance = atr * request.atr_multiplier;
        candidates.push(if short { entry + distance } else { entry - distance });
    }

    if short {
        candidates.into_iter().filter(|c| *c > entry).min()
    } else {
        candidates.into_iter().filter(|c| *c < entry).max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn assessor() -> TradeRiskAssessor {
        TradeRiskAssessor::new(AuditLog::new(std::env::temp_dir().join("assessor-tests")))
    }

    fn policy() -> AssessorPolicy {
        AssessorPolicy::default()
    }

    #[test]
    fn test_buy_with_fixed_stop() {
        let request =
            AssessmentRequest::new("AAPL", TradeAction::Buy, dec!(100_000), dec!(150));
        let decision = assessor().assess(&policy(), &request);

        assert!(decision.approved);
        assert_eq!(decision.stop_loss, Some(dec!(142.50)));
        // risk = 1000, risk_per_share = 7.50 → floor(133.33)
        assert_eq!(decision.position_size, 133);
        assert_eq!(decision.risk_amount, dec!(1000));
    }

    #[test]
    fn test_short_stop_is_above_entry() {
        let request =
            AssessmentRequest::new("AAPL", TradeAction::Short, dec!(100_000), dec!(150));
        let decision = assessor().assess(&policy(), &request);

        assert!(decision.approved);
        assert_eq!(decision.stop_loss, Some(dec!(157.50)));
        assert_eq!(decision.position_size, 133);
    }

    #[test]
    fn test_buy_tightest_stop_wins() {
        let mut policy = policy();
        policy.stop_loss_pct = dec!(0.10); // fixed stop at 135
        let mut request =
            AssessmentRequest::new("AAPL", TradeAction::Buy, dec!(100_000), dec!(150));
        request.atr = Some(dec!(4));
        // ATR stop at 150 - 4 * 2.5 = 140, tighter than 135
        let decision = assessor().assess(&policy, &request);

        assert_eq!(decision.stop_loss, Some(dec!(140.0)));
    }

    #[test]
    fn test_short_tightest_stop_wins() {
        let mut request =
            AssessmentRequest::new("AAPL", TradeAction::Short, dec!(100_000), dec!(150));
        request.atr = Some(dec!(3));
        request.atr_multiplier = dec!(2);
        // ATR stop at 156, tighter than the fixed 157.50
        let decision = assessor().assess(&policy(), &request);

        assert_eq!(decision.stop_loss, Some(dec!(156)));
    }

    #[test]
    fn test_technical_stop_on_wrong_side_is_ignored() {
        let mut request =
            AssessmentRequest::new("AAPL", TradeAction::Buy, dec!(100_000), dec!(150));
        request.technical_stop = Some(dec!(160)); // above entry, invalid for a buy
        let decision = assessor().assess(&policy(), &request);

        assert!(decision.approved);
        assert_eq!(decision.stop_loss, Some(dec!(142.50)));
    }

    #[test]
    fn test_technical_stop_ignored_when_disabled() {
        let mut policy = policy();
        policy.enable_technical_stop = false;
        let mut request =
            AssessmentRequest::new("AAPL", TradeAction::Buy, dec!(100_000), dec!(150));
        request.technical_stop = Some(dec!(148)); // tighter than the fixed 142.50
        let decision = assessor().assess(&policy, &request);

        assert!(decision.approved);
        assert_eq!(decision.stop_loss, Some(dec!(142.50)));
    }

    #[test]
    fn test_technical_stop_wins_when_enabled() {
        let mut request =
            AssessmentRequest::new("AAPL", TradeAction::Buy, dec!(100_000), dec!(150));
        request.technical_stop = Some(dec!(148));
        let decision = assessor().assess(&policy(), &request);

        assert_eq!(decision.stop_loss, Some(dec!(148)));
    }

    #[test]
    fn test_rejects_when_no_valid_stop() {
        let mut policy = policy();
        // A zero-percent fixed stop lands exactly on entry, which is not
        // below it; the technical candidate is on the wrong side too.
        policy.stop_loss_pct = dec!(0);
        let mut request =
            AssessmentRequest::new("AAPL", TradeAction::Buy, dec!(100_000), dec!(150));
        request.technical_stop = Some(dec!(155));
        let decision = assessor().assess(&policy, &request);

        assert!(!decision.approved);
        assert!(decision.reason.contains("stop-loss"));
    }

    #[test]
    fn test_risk_reward_below_minimum_is_rejected() {
        let mut policy = policy();
        policy.min_risk_reward_ratio = Some(dec!(1.5));
        let mut request =
            AssessmentRequest::new("AAPL", TradeAction::Buy, dec!(100_000), dec!(150));
        request.take_profit = Some(dec!(155)); // reward 5 vs risk 7.50 → 0.67
        let decision = assessor().assess(&policy, &request);

        assert!(!decision.approved);
        assert!(decision.reason.contains("Risk/Reward ratio"));
    }

    #[test]
    fn test_reward_multiplier_derives_take_profit() {
        let mut policy = policy();
        policy.min_risk_reward_ratio = Some(dec!(1.5));
        let mut request =
            AssessmentRequest::new("AAPL", TradeAction::Buy, dec!(100_000), dec!(150));
        request.reward_multiplier = Some(dec!(2));
        let decision = assessor().assess(&policy, &request);

        assert!(decision.approved);
        // entry 150 + 7.50 * 2
        assert_eq!(decision.take_profit, Some(dec!(165.0)));
        assert_eq!(decision.risk_reward_ratio, Some(dec!(2)));
    }

    #[test]
    fn test_max_position_cap_scales_and_recomputes_risk() {
        let mut policy = policy();
        policy.risk_per_trade = dec!(0.05);
        policy.max_position_pct = dec!(0.10);
        let request =
            AssessmentRequest::new("AAPL", TradeAction::Buy, dec!(100_000), dec!(150));
        let decision = assessor().assess(&policy, &request);

        assert!(decision.approved);
        // uncapped: 5000 / 7.50 = 666; cap: 10000 / 150 = 66
        assert_eq!(decision.position_size, 66);
        assert_eq!(decision.risk_amount, dec!(66) * dec!(7.50));
        assert!(decision.reason.contains("scaled down"));
    }

    #[test]
    fn test_sell_existing_position_approved_at_full_size() {
        let mut request =
            AssessmentRequest::new("AAPL", TradeAction::Sell, dec!(100_000), dec!(150));
        request.current_position = 40;
        let decision = assessor().assess(&policy(), &request);

        assert!(decision.approved);
        assert_eq!(decision.position_size, 40);
        assert_eq!(decision.risk_amount, Decimal::ZERO);
        assert_eq!(decision.reason, "Approval to sell existing position.");
    }

    #[test]
    fn test_sell_without_position_rejected() {
        let request =
            AssessmentRequest::new("AAPL", TradeAction::Sell, dec!(100_000), dec!(150));
        let decision = assessor().assess(&policy(), &request);

        assert!(!decision.approved);
        assert_eq!(decision.reason, "No existing position to sell.");
        assert_eq!(decision.position_size, 0);
    }

    #[test]
    fn test_cover_short_position() {
        let mut request =
            AssessmentRequest::new("AAPL", TradeAction::Cover, dec!(100_000), dec!(150));
        request.current_position = -100;
        let decision = assessor().assess(&policy(), &request);

        assert!(decision.approved);
        assert_eq!(decision.position_size, 100);
        assert_eq!(decision.reason, "Approval to cover existing short position.");
    }

    #[test]
    fn test_cover_without_short_rejected() {
        let mut request =
            AssessmentRequest::new("AAPL", TradeAction::Cover, dec!(100_000), dec!(150));
        request.current_position = 10; // long, nothing to cover
        let decision = assessor().assess(&policy(), &request);

        assert!(!decision.approved);
    }

    #[test]
    fn test_invalid_portfolio_value_rejected() {
        let request = AssessmentRequest::new("AAPL", TradeAction::Buy, dec!(0), dec!(150));
        let decision = assessor().assess(&policy(), &request);

        assert!(!decision.approved);
        assert!(decision.reason.contains("Portfolio value"));
    }

    #[test]
    fn test_invalid_risk_per_trade_rejected() {
        let mut policy = policy();
        policy.risk_per_trade = dec!(1);
        let request =
            AssessmentRequest::new("AAPL", TradeAction::Buy, dec!(100_000), dec!(150));
        let decision = assessor().assess(&policy, &request);

        assert!(!decision.approved);
        assert!(decision.reason.contains("Risk per trade"));
    }

    #[test]
    fn test_zero_entry_price_rejected() {
        let request = AssessmentRequest::new("AAPL", TradeAction::Buy, dec!(100_000), dec!(0));
        let decision = assessor().assess(&policy(), &request);

        assert!(!decision.approved);
        assert!(decision.reason.contains("Entry price"));
    }

    proptest! {
        /// An approved opening trade never risks more than the
        /// configured fraction of portfolio value.
        #[test]
        fn prop_risk_never_exceeds_budget(
            portfolio in 1_000u32..1_000_000,
            risk_bps in 10u32..500,
            stop_bps in 100u32..2_000,
            entry_cents in 100u32..100_000,
        ) {
            let policy = AssessorPolicy {
                risk_per_trade: Decimal::new(i64::from(risk_bps), 4),
                stop_loss_pct: Decimal::new(i64::from(stop_bps), 4),
                max_position_pct: dec!(1),
                min_risk_reward_ratio: None,
                enable_technical_stop: true,
            };
            let request = AssessmentRequest::new(
                "PROP",
                TradeAction::Buy,
                Decimal::from(portfolio),
                Decimal::new(i64::from(entry_cents), 2),
            );
            let decision = evaluate(&policy, &request);

            if decision.approved {
                let risk_per_share =
                    (decision.entry_price - decision.stop_loss.unwrap()).abs();
                let realized = Decimal::from(decision.position_size) * risk_per_share;
                prop_assert!(realized <= Decimal::from(portfolio) * policy.risk_per_trade);
            }
        }
    }
}
