//! Decision Engine Binary
//!
//! Starts the Quorum decision engine: loads configuration, opens the
//! policy store, then runs orchestration cycles on a fixed interval
//! until interrupted.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin decision-engine -- [config.yaml]
//! ```
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Log level override (default: from config)

use std::sync::Arc;

use anyhow::Context;
use decision_engine::config::load_config;
use decision_engine::engine::DecisionEngine;
use decision_engine::observability::init_tracing;
use decision_engine::policy::PolicyStore;
use tokio::signal;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args().nth(1);
    let config = load_config(config_path.as_deref()).context("failed to load configuration")?;

    init_tracing(&config.logging).context("failed to initialize tracing")?;

    let policy = Arc::new(
        PolicyStore::open(
            config.risk.policy_defaults(),
            config.risk.policy_bounds(),
            &config.persistence.policy_dir,
        )
        .context("failed to open policy store")?,
    );

    let engine = DecisionEngine::from_config(&config, Arc::clone(&policy))
        .context("failed to build decision engine")?;

    tracing::info!(
        instruments = ?config.engine.instruments,
        interval_secs = config.engine.cycle_interval_secs,
        "Decision engine started"
    );

    let mut interval = tokio::time::interval(std::time::Duration::from_secs(
        config.engine.cycle_interval_secs,
    ));
    let mut cycles_since_learning: u32 = 0;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                match engine.run_cycle().await {
                    Ok(report) => {
                        tracing::info!(
                            cycle_id = %report.cycle_id,
                            decisions = report.decisions.len(),
                            executions = report.executions.len(),
                            "Cycle finished"
                        );
                    }
                    Err(error) => {
                        // A dead ledger fails the cycle; the next tick retries.
                        tracing::error!(%error, "Cycle failed");
                        continue;
                    }
                }

                cycles_since_learning += 1;
                if config.engine.learning_interval_cycles > 0
                    && cycles_since_learning >= config.engine.learning_interval_cycles
                {
                    cycles_since_learning = 0;
                    if let Err(error) = engine.run_learning_cycle().await {
                        tracing::error!(%error, "Learning cycle failed");
                    }
                }
            }
            _ = signal::ctrl_c() => {
                tracing::info!("Shutdown signal received");
                break;
            }
        }
    }

    tracing::info!("Decision engine stopped");
    Ok(())
}
