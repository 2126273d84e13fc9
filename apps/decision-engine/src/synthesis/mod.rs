//! Weighted verdict synthesis.
//!
//! Fuses N independent agent signals for one instrument into a single
//! directional verdict using per-class weights and an optional
//! instrument-specific bias.
//!
//! The score thresholds are part of the observable contract and must
//! not drift:
//!
//! | Score | Verdict |
//! |-------|---------|
//! | >= 0.8 | strong_buy |
//! | >= 0.2 | buy |
//! | > -0.2 | hold |
//! | > -0.8 | sell |
//! | else | strong_sell |

use std::collections::BTreeMap;

use crate::models::{Signal, Verdict, VerdictAction};

/// Weight used when a signal's class has no configured weight.
const DEFAULT_CLASS_WEIGHT: f64 = 0.5;

/// Fuse signals for one instrument into a verdict.
///
/// Each signal contributes `action_value * weight(class)` where weights
/// are looked up by the signal's declared class and are deliberately
/// not normalized here (the policy store renormalizes after learning
/// deltas; callers keep weights coherent otherwise). The instrument
/// bias is a magnitude multiplier: `score = base * (1 + bias)`, with
/// bias in [-1, 1], so -1 cancels the score and +1 doubles it.
///
/// Missing signals are simply absent from the sum; there are no error
/// paths.
#[must_use]
pub fn synthesize(
    instrument_id: &str,
    signals: Vec<Signal>,
    weights: &BTreeMap<String, f64>,
    bias: f64,
) -> Verdict {
    let base_score: f64 = signals
        .iter()
        .map(|signal| {
            let weight = weights
                .get(&signal.class)
                .copied()
                .unwrap_or(DEFAULT_CLASS_WEIGHT);
            signal.action.value() * weight
        })
        .sum();

    let score = base_score * (1.0 + bias);
    let action = action_for_score(score);

    tracing::debug!(
        instrument_id,
        base_score,
        bias,
        score,
        verdict = %action,
        "Synthesized verdict"
    );

    Verdict {
        instrument_id: instrument_id.to_string(),
        action,
        score,
        signals,
    }
}

/// Map a weighted score to a verdict action using the fixed thresholds.
#[must_use]
pub fn action_for_score(score: f64) -> VerdictAction {
    if score >= 0.8 {
        VerdictAction::StrongBuy
    } else if score >= 0.2 {
        VerdictAction::Buy
    } else if score > -0.2 {
        VerdictAction::Hold
    } else if score > -0.8 {
        VerdictAction::Sell
    } else {
        VerdictAction::StrongSell
    }
}
