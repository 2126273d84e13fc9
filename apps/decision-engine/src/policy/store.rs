//! Live policy parameters with bounded learning deltas.
//!
//! The store holds the effective parameter set consulted by synthesis,
//! assessment, and allocation. Static defaults come from configuration;
//! dynamic overrides arrive as additive deltas from the learning
//! service and are clamped to configured bounds before taking effect.
//!
//! Every mutation snapshots the prior effective set to a timestamped
//! file under `history/` before the new overrides are written, so the
//! parameter history is append-only and auditable.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Policy store failures. Reads never fail; these surface only from
/// construction and delta application.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// Reading or writing a policy document failed.
    #[error("policy I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// A policy document could not be serialized or parsed.
    #[error("policy serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// The full effective parameter set at one point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicySnapshot {
    /// Per-class weights consumed by verdict synthesis.
    pub agent_weights: BTreeMap<String, f64>,
    /// Per-instrument bias in [-1, 1], applied as a score multiplier.
    pub instrument_bias: BTreeMap<String, f64>,
    /// Fraction of portfolio value risked per trade.
    pub risk_per_trade: Decimal,
    /// Fixed percentage stop distance from entry.
    pub stop_loss_pct: Decimal,
    /// Maximum position notional as a fraction of portfolio value.
    pub max_position_pct: Decimal,
    /// Ceiling on total exposure as a fraction of cash.
    pub max_total_exposure: Decimal,
    /// Fraction of cash risked across all new trades in one cycle.
    pub per_cycle_risk_budget: Decimal,
    /// Smallest admissible notional after budget scaling.
    pub min_position_value: Decimal,
    /// Minimum acceptable risk/reward ratio, if configured.
    pub min_risk_reward_ratio: Option<Decimal>,
    /// Open short positions on bearish verdicts with no long to sell.
    pub enable_short: bool,
    /// Consider technical-indicator stop hints as stop candidates.
    pub enable_technical_stop: bool,
}

impl Default for PolicySnapshot {
    fn default() -> Self {
        Self {
            agent_weights: BTreeMap::from([
                ("technical".to_string(), 0.5),
                ("fundamental".to_string(), 0.5),
            ]),
            instrument_bias: BTreeMap::new(),
            risk_per_trade: dec!(0.01),
            stop_loss_pct: dec!(0.05),
            max_position_pct: dec!(0.20),
            max_total_exposure: dec!(0.80),
            per_cycle_risk_budget: dec!(0.02),
            min_position_value: dec!(1000),
            min_risk_reward_ratio: None,
            enable_short: false,
            enable_technical_stop: true,
        }
    }
}

impl PolicySnapshot {
    /// Effective bias for one instrument (0 when none is set).
    #[must_use]
    pub fn bias_for(&self, instrument_id: &str) -> f64 {
        self.instrument_bias
            .get(instrument_id)
            .copied()
            .unwrap_or(0.0)
    }
}

/// Clamping bounds applied when deltas mutate the policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyBounds {
    /// Lower clamp for `risk_per_trade`.
    pub min_risk_per_trade: Decimal,
    /// Upper clamp for `risk_per_trade`.
    pub max_risk_per_trade: Decimal,
    /// Lower clamp for `stop_loss_pct`.
    pub min_stop_loss_pct: Decimal,
    /// Upper clamp for `stop_loss_pct`.
    pub max_stop_loss_pct: Decimal,
}

impl Default for PolicyBounds {
    fn default() -> Self {
        Self {
            min_risk_per_trade: dec!(0.001),
            max_risk_per_trade: dec!(0.05),
            min_stop_loss_pct: dec!(0.01),
            max_stop_loss_pct: dec!(0.15),
        }
    }
}

/// Additive adjustment proposed by the learning service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyDelta {
    /// Additive adjustment to `risk_per_trade`, clamped to bounds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_per_trade: Option<Decimal>,
    /// Additive adjustment to `stop_loss_pct`, clamped to bounds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_loss_pct: Option<Decimal>,
    /// Additive per-class weight adjustments; the full map is
    /// renormalized to sum to 1 after applying them.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub agent_weights: BTreeMap<String, f64>,
    /// Additive per-instrument bias adjustments, clamped to [-1, 1].
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub instrument_bias: BTreeMap<String, f64>,
}

impl PolicyDelta {
    /// Whether applying this delta would change nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.risk_per_trade.is_none()
            && self.stop_loss_pct.is_none()
            && self.agent_weights.is_empty()
            && self.instrument_bias.is_empty()
    }
}

/// Dynamic overrides persisted separately from the static defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct PolicyOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    risk_per_trade: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    stop_loss_pct: Option<Decimal>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    agent_weights: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    instrument_bias: BTreeMap<String, f64>,
}

/// Shared, read-mostly policy state. Reads take a snapshot; writes are
/// serialized behind the write lock and persist before returning.
#[derive(Debug)]
pub struct PolicyStore {
    defaults: PolicySnapshot,
    bounds: PolicyBounds,
    overrides_path: PathBuf,
    history_dir: PathBuf,
    current: RwLock<PolicySnapshot>,
}

impl PolicyStore {
    /// Open the store, merging any persisted overrides over `defaults`.
    pub fn open(
        defaults: PolicySnapshot,
        bounds: PolicyBounds,
        data_dir: impl AsRef<Path>,
    ) -> Result<Self, PolicyError> {
        let data_dir = data_dir.as_ref();
        std::fs::create_dir_all(data_dir)?;
        let overrides_path = data_dir.join("policy_overrides.json");
        let history_dir = data_dir.join("history");

        let mut effective = defaults.clone();
        if overrides_path.exists() {
            let raw = std::fs::read_to_string(&overrides_path)?;
            let overrides: PolicyOverrides = serde_json::from_str(&raw)?;
            apply_overrides(&mut effective, &overrides);
            tracing::info!(path = %overrides_path.display(), "Loaded persisted policy overrides");
        }

        Ok(Self {
            defaults,
            bounds,
            overrides_path,
            history_dir,
            current: RwLock::new(effective),
        })
    }

    /// Current effective parameter set.
    #[must_use]
    pub fn snapshot(&self) -> PolicySnapshot {
        self.current
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Apply one bounded delta atomically: snapshot the prior set to
    /// history, merge and clamp, persist the new overrides, then swap.
    ///
    /// An empty delta is a no-op and touches neither disk nor state.
    pub fn apply_delta(&self, delta: &PolicyDelta) -> Result<(), PolicyError> {
        if delta.is_empty() {
            return Ok(());
        }

        let mut current = self
            .current
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        self.write_history_snapshot(&current)?;

        let mut next = current.clone();
        if let Some(adjustment) = delta.risk_per_trade {
            next.risk_per_trade = (next.risk_per_trade + adjustment)
                .clamp(self.bounds.min_risk_per_trade, self.bounds.max_risk_per_trade);
        }
        if let Some(adjustment) = delta.stop_loss_pct {
            next.stop_loss_pct = (next.stop_loss_pct + adjustment)
                .clamp(self.bounds.min_stop_loss_pct, self.bounds.max_stop_loss_pct);
        }
        if !delta.agent_weights.is_empty() {
            for (class, adjustment) in &delta.agent_weights {
                *next.agent_weights.entry(class.clone()).or_insert(0.0) += adjustment;
            }
            renormalize(&mut next.agent_weights);
        }
        for (instrument, adjustment) in &delta.instrument_bias {
            let bias = next.instrument_bias.entry(instrument.clone()).or_insert(0.0);
            *bias = (*bias + adjustment).clamp(-1.0, 1.0);
        }

        self.persist_overrides(&next)?;
        tracing::info!(
            risk_per_trade = %next.risk_per_trade,
            weights = ?next.agent_weights,
            "Applied policy delta"
        );
        *current = next;
        Ok(())
    }

    fn write_history_snapshot(&self, snapshot: &PolicySnapshot) -> Result<(), PolicyError> {
        std::fs::create_dir_all(&self.history_dir)?;
        let name = format!("policy-{}.json", Utc::now().format("%Y%m%dT%H%M%S%.3f"));
        let path = self.history_dir.join(name);
        std::fs::write(&path, serde_json::to_string_pretty(snapshot)?)?;
        Ok(())
    }

    fn persist_overrides(&self, effective: &PolicySnapshot) -> Result<(), PolicyError> {
        let overrides = PolicyOverrides {
            risk_per_trade: (effective.risk_per_trade != self.defaults.risk_per_trade)
                .then_some(effective.risk_per_trade),
            stop_loss_pct: (effective.stop_loss_pct != self.defaults.stop_loss_pct)
                .then_some(effective.stop_loss_pct),
            agent_weights: if effective.agent_weights == self.defaults.agent_weights {
                BTreeMap::new()
            } else {
                effective.agent_weights.clone()
            },
            instrument_bias: effective.instrument_bias.clone(),
        };
        std::fs::write(&self.overrides_path, serde_json::to_string_pretty(&overrides)?)?;
        Ok(())
    }
}

fn apply_overrides(snapshot: &mut PolicySnapshot, overrides: &PolicyOverrides) {
    if let Some(risk) = overrides.risk_per_trade {
        snapshot.risk_per_trade = risk;
    }
    if let Some(stop) = overrides.stop_loss_pct {
        snapshot.stop_loss_pct = stop;
    }
    if !overrides.agent_weights.is_empty() {
        snapshot.agent_weights = overrides.agent_weights.clone();
    }
    for (instrument, bias) in &overrides.instrument_bias {
        snapshot.instrument_bias.insert(instrument.clone(), *bias);
    }
}

/// Rescale weights so they sum to 1.0 (left untouched when the sum is
/// not positive).
fn renormalize(weights: &mut BTreeMap<String, f64>) {
    let total: f64 = weights.values().sum();
    if total > 0.0 {
        for weight in weights.values_mut() {
            *weight /= total;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(dir: &Path) -> PolicyStore {
        PolicyStore::open(PolicySnapshot::default(), PolicyBounds::default(), dir).unwrap()
    }

    #[test]
    fn test_defaults_without_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());

        let snapshot = store.snapshot();
        assert_eq!(snapshot.risk_per_trade, dec!(0.01));
        assert_eq!(snapshot.agent_weights.get("technical"), Some(&0.5));
    }

    #[test]
    fn test_risk_delta_is_additive_and_clamped() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());

        store
            .apply_delta(&PolicyDelta {
                risk_per_trade: Some(dec!(0.005)),
                ..PolicyDelta::default()
            })
            .unwrap();
        assert_eq!(store.snapshot().risk_per_trade, dec!(0.015));

        // Pushes past the upper bound
        store
            .apply_delta(&PolicyDelta {
                risk_per_trade: Some(dec!(1)),
                ..PolicyDelta::default()
            })
            .unwrap();
        assert_eq!(store.snapshot().risk_per_trade, dec!(0.05));
    }

    #[test]
    fn test_stop_delta_is_additive_and_clamped() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());

        store
            .apply_delta(&PolicyDelta {
                stop_loss_pct: Some(dec!(0.02)),
                ..PolicyDelta::default()
            })
            .unwrap();
        assert_eq!(store.snapshot().stop_loss_pct, dec!(0.07));

        store
            .apply_delta(&PolicyDelta {
                stop_loss_pct: Some(dec!(-1)),
                ..PolicyDelta::default()
            })
            .unwrap();
        assert_eq!(store.snapshot().stop_loss_pct, dec!(0.01));
    }

    #[test]
    fn test_weight_delta_renormalizes_to_one() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());

        store
            .apply_delta(&PolicyDelta {
                agent_weights: BTreeMap::from([("technical".to_string(), 0.5)]),
                ..PolicyDelta::default()
            })
            .unwrap();

        let weights = store.snapshot().agent_weights;
        let total: f64 = weights.values().sum();
        assert!((total - 1.0).abs() < 1e-9);
        // technical 1.0 vs fundamental 0.5 → 2/3 vs 1/3
        assert!((weights["technical"] - 2.0 / 3.0).abs() < 1e-9);
        assert!((weights["fundamental"] - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_bias_clamped_to_unit_interval() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());

        store
            .apply_delta(&PolicyDelta {
                instrument_bias: BTreeMap::from([("TSLA".to_string(), 3.0)]),
                ..PolicyDelta::default()
            })
            .unwrap();

        assert_eq!(store.snapshot().bias_for("TSLA"), 1.0);
        assert_eq!(store.snapshot().bias_for("AAPL"), 0.0);
    }

    #[test]
    fn test_history_snapshot_written_before_mutation() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());

        store
            .apply_delta(&PolicyDelta {
                risk_per_trade: Some(dec!(0.005)),
                ..PolicyDelta::default()
            })
            .unwrap();

        let history: Vec<_> = std::fs::read_dir(dir.path().join("history"))
            .unwrap()
            .collect();
        assert_eq!(history.len(), 1);

        // The snapshot holds the value prior to the delta
        let raw = std::fs::read_to_string(history[0].as_ref().unwrap().path()).unwrap();
        let prior: PolicySnapshot = serde_json::from_str(&raw).unwrap();
        assert_eq!(prior.risk_per_trade, dec!(0.01));
    }

    #[test]
    fn test_overrides_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = store(dir.path());
            store
                .apply_delta(&PolicyDelta {
                    risk_per_trade: Some(dec!(0.01)),
                    instrument_bias: BTreeMap::from([("TSLA".to_string(), 0.2)]),
                    ..PolicyDelta::default()
                })
                .unwrap();
        }

        let reopened = store(dir.path());
        let snapshot = reopened.snapshot();
        assert_eq!(snapshot.risk_per_trade, dec!(0.02));
        assert_eq!(snapshot.bias_for("TSLA"), 0.2);
    }

    #[test]
    fn test_empty_delta_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());

        store.apply_delta(&PolicyDelta::default()).unwrap();

        let snapshot = store.snapshot();
        assert_eq!(snapshot.risk_per_trade, dec!(0.01));
        assert!(!dir.path().join("history").exists());
        assert!(!dir.path().join("policy_overrides.json").exists());
    }
}
