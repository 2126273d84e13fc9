//! Orchestration cycle.
//!
//! One cycle: query every analysis agent for every instrument (all
//! pipelines concurrent), fuse signals into verdicts, run the portfolio
//! allocator once over the tradable verdicts, then submit the admitted
//! orders concurrently. Allocation is the only serialized step; by the
//! time orders go out, the shared budget decision is already made, so
//! concurrent submission cannot race on it.
//!
//! Partial failure is the normal case: a dead agent degrades a verdict,
//! a dead instrument is excluded with an error status, and only a dead
//! ledger (no balance, no positions) fails the cycle.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::clients::{
    AnalysisAgentClient, ExecutionClient, LearningClient, LedgerClient, decimal_indicator,
};
use crate::config::Config;
use crate::error::EngineError;
use crate::models::{
    CycleReport, ExecutionReport, InstrumentReport, InstrumentStatus, OrderRequest, Position,
    RiskDecision, Signal, SubmissionOutcome, VerdictAction,
};
use crate::policy::{PolicySnapshot, PolicyStore};
use crate::resilience::{HttpTransport, ResilientClient};
use crate::risk::{
    AllocatorPolicy, AssessorPolicy, AuditLog, PortfolioAllocator, TradeCandidate,
    TradeRiskAssessor,
};
use crate::synthesis::synthesize;

/// The full decision pipeline for one account.
pub struct DecisionEngine {
    agents: Vec<AnalysisAgentClient>,
    execution: ExecutionClient,
    ledger: LedgerClient,
    learning: Option<LearningClient>,
    policy: Arc<PolicyStore>,
    allocator: PortfolioAllocator,
    instruments: Vec<String>,
    account_id: i64,
}

impl DecisionEngine {
    /// Wire up every downstream client from configuration.
    pub fn from_config(config: &Config, policy: Arc<PolicyStore>) -> Result<Self, EngineError> {
        let timeout = Duration::from_secs(config.services.request_timeout_secs);
        let transport = Arc::new(HttpTransport::new(timeout)?);
        let retry = config.resilience.retry_policy();
        let breaker = config.resilience.breaker_config();

        let client = |name: &str, base_url: &str| {
            ResilientClient::new(
                name,
                base_url,
                Arc::clone(&transport) as Arc<dyn crate::resilience::Transport>,
                retry.clone(),
                breaker.clone(),
            )
        };

        let agents = config
            .services
            .agents
            .iter()
            .map(|agent| {
                AnalysisAgentClient::new(&agent.class, client(&agent.name, &agent.base_url))
            })
            .collect();
        let execution = ExecutionClient::new(client("execution", &config.services.execution_url));
        let ledger = LedgerClient::new(
            client("ledger", &config.services.ledger_url),
            config.engine.account_id,
        );
        let learning = config
            .services
            .learning_url
            .as_deref()
            .map(|url| LearningClient::new(client("learning", url)));

        let audit = AuditLog::new(&config.persistence.audit_dir);
        let allocator = PortfolioAllocator::new(TradeRiskAssessor::new(audit));

        Ok(Self {
            agents,
            execution,
            ledger,
            learning,
            policy,
            allocator,
            instruments: config.engine.instruments.clone(),
            account_id: config.engine.account_id,
        })
    }

    /// Run one full orchestration cycle.
    ///
    /// Fails only when the ledger is unreachable; analysis and
    /// execution failures degrade into per-instrument and per-trade
    /// statuses in the report.
    pub async fn run_cycle(&self) -> Result<CycleReport, EngineError> {
        let cycle_id = Uuid::new_v4().to_string();
        let started_at = Utc::now();
        tracing::info!(cycle_id, instruments = self.instruments.len(), "Cycle started");

        let balance = self.ledger.balance(&cycle_id).await?;
        let positions = self.ledger.positions(&cycle_id).await?;
        let snapshot = self.policy.snapshot();

        // All per-instrument pipelines run concurrently.
        let reports = join_all(
            self.instruments
                .iter()
                .map(|instrument| self.analyze_instrument(instrument, &cycle_id, &snapshot)),
        )
        .await;

        let candidates = tradable_candidates(&reports, &positions);
        let decisions =
            self.allocator
                .allocate(&allocator_policy(&snapshot), candidates, &balance, &positions);

        let executions = self.submit_admitted(&decisions, &cycle_id).await;

        let report = CycleReport {
            cycle_id,
            started_at,
            instruments: reports,
            decisions,
            executions,
        };
        tracing::info!(
            cycle_id = %report.cycle_id,
            approved = report.decisions.iter().filter(|d| d.approved).count(),
            submitted = report
                .executions
                .iter()
                .filter(|e| matches!(e.outcome, SubmissionOutcome::Submitted { .. }))
                .count(),
            "Cycle complete"
        );
        Ok(report)
    }

    /// Query every agent for one instrument concurrently and fuse
    /// whatever came back.
    async fn analyze_instrument(
        &self,
        instrument_id: &str,
        cycle_id: &str,
        snapshot: &PolicySnapshot,
    ) -> InstrumentReport {
        let correlation_id = format!("{cycle_id}:{instrument_id}");
        let outcomes = join_all(
            self.agents
                .iter()
                .map(|agent| agent.analyze(instrument_id, &correlation_id)),
        )
        .await;

        let total = outcomes.len();
        let mut signals = Vec::with_capacity(total);
        let mut errors = Vec::new();
        for (agent, outcome) in self.agents.iter().zip(outcomes) {
            match outcome {
                Ok(signal) => signals.push(signal),
                Err(error) => {
                    tracing::warn!(
                        instrument_id,
                        agent = agent.name(),
                        %error,
                        "Agent signal failed"
                    );
                    errors.push(format!("{}: {error}", agent.name()));
                }
            }
        }

        if signals.is_empty() {
            return InstrumentReport {
                instrument_id: instrument_id.to_string(),
                status: InstrumentStatus::Error,
                verdict: None,
                error: Some(errors.join("; ")),
            };
        }

        let status = if errors.is_empty() {
            InstrumentStatus::Complete
        } else {
            InstrumentStatus::Partial
        };
        let verdict = synthesize(
            instrument_id,
            signals,
            &snapshot.agent_weights,
            snapshot.bias_for(instrument_id),
        );

        InstrumentReport {
            instrument_id: instrument_id.to_string(),
            status,
            verdict: Some(verdict),
            error: (!errors.is_empty()).then(|| errors.join("; ")),
        }
    }

    /// Submit every admitted decision concurrently. The allocator has
    /// already serialized the budget, so order here does not matter.
    async fn submit_admitted(
        &self,
        decisions: &[RiskDecision],
        cycle_id: &str,
    ) -> Vec<ExecutionReport> {
        let submissions = decisions
            .iter()
            .filter(|decision| decision.approved)
            .map(|decision| async move {
                let order = OrderRequest {
                    instrument_id: decision.instrument_id.clone(),
                    side: decision.action,
                    quantity: decision.position_size,
                    price: decision.entry_price,
                    client_order_id: Uuid::new_v4().to_string(),
                    account_id: self.account_id,
                };
                let correlation_id = format!("{cycle_id}:{}", decision.instrument_id);
                let outcome = match self.execution.submit(&order, &correlation_id).await {
                    Ok(response) => SubmissionOutcome::Submitted {
                        order_id: response.order_id,
                        status: response.status,
                    },
                    Err(error) => {
                        tracing::error!(
                            instrument_id = %decision.instrument_id,
                            %error,
                            "Order submission failed"
                        );
                        SubmissionOutcome::Failed {
                            reason: error.to_string(),
                        }
                    }
                };
                ExecutionReport {
                    decision: decision.clone(),
                    outcome,
                }
            });
        join_all(submissions).await
    }

    /// Run one learning round trip and apply the returned deltas.
    ///
    /// A no-op when no learning service is configured.
    pub async fn run_learning_cycle(&self) -> Result<(), EngineError> {
        let Some(learning) = &self.learning else {
            tracing::debug!("No learning service configured, skipping");
            return Ok(());
        };

        let correlation_id = format!("learn:{}", Uuid::new_v4());
        let trade_history = self.ledger.trade_history(&correlation_id).await?;
        let mut price_history = BTreeMap::new();
        for instrument in &self.instruments {
            match self.ledger.price_history(instrument, &correlation_id).await {
                Ok(bars) => {
                    price_history.insert(instrument.clone(), bars);
                }
                Err(error) => {
                    tracing::warn!(instrument, %error, "Price history unavailable");
                }
            }
        }

        let request = crate::clients::LearningRequest {
            trade_history,
            price_history,
            current_policy: self.policy.snapshot(),
        };
        let delta = learning.learn(&request, &correlation_id).await?;
        self.policy.apply_delta(&delta)?;
        Ok(())
    }
}

/// Extract the allocator candidates from the per-instrument reports.
/// Only plain buy/sell verdicts trade; holds, strong verdicts, and
/// failed instruments are reported but never reach the allocator.
fn tradable_candidates(
    reports: &[InstrumentReport],
    positions: &[Position],
) -> Vec<TradeCandidate> {
    let marks: BTreeMap<&str, Decimal> = positions
        .iter()
        .map(|position| (position.instrument_id.as_str(), position.mark_price()))
        .collect();

    reports
        .iter()
        .filter_map(|report| report.verdict.as_ref())
        .filter(|verdict| matches!(verdict.action, VerdictAction::Buy | VerdictAction::Sell))
        .map(|verdict| {
            let entry_price = entry_price_for(&verdict.signals)
                .or_else(|| marks.get(verdict.instrument_id.as_str()).copied())
                .unwrap_or(Decimal::ZERO);
            TradeCandidate {
                entry_price,
                technical_stop: technical_stop_for(&verdict.signals),
                atr: atr_for(&verdict.signals),
                verdict: verdict.clone(),
            }
        })
        .collect()
}

/// First reported price wins; agents that do not quote prices simply
/// do not contribute.
fn entry_price_for(signals: &[Signal]) -> Option<Decimal> {
    signals.iter().find_map(|signal| signal.current_price)
}

fn technical_stop_for(signals: &[Signal]) -> Option<Decimal> {
    signals.iter().find_map(|signal| signal.stop_loss_hint)
}

fn atr_for(signals: &[Signal]) -> Option<Decimal> {
    signals
        .iter()
        .find_map(|signal| decimal_indicator(&signal.extras, "atr"))
}

fn allocator_policy(snapshot: &PolicySnapshot) -> AllocatorPolicy {
    AllocatorPolicy {
        per_cycle_risk_budget: snapshot.per_cycle_risk_budget,
        max_total_exposure: snapshot.max_total_exposure,
        min_position_value: snapshot.min_position_value,
        enable_short: snapshot.enable_short,
        assessor: AssessorPolicy {
            risk_per_trade: snapshot.risk_per_trade,
            stop_loss_pct: snapshot.stop_loss_pct,
            max_position_pct: snapshot.max_position_pct,
            min_risk_reward_ratio: snapshot.min_risk_reward_ratio,
            enable_technical_stop: snapshot.enable_technical_stop,
        },
    }
}
