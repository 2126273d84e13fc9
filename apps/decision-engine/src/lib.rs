// Allow unwrap/expect in tests - tests should panic on unexpected errors
// Allow test-specific patterns and pedantic lints in test code
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::default_trait_access,
        clippy::items_after_statements,
        clippy::or_fun_call
    )
)]

//! Decision Engine - Rust Core Library
//!
//! Decision-and-resilience engine for the Quorum trading system.
//!
//! # Pipeline
//!
//! One orchestration cycle flows through four stages:
//!
//! 1. **Analysis** (`clients`, `resilience`): every configured agent is
//!    queried for every instrument through retrying, circuit-broken
//!    clients; partial failure degrades, it never aborts.
//! 2. **Synthesis** (`synthesis`): per-agent signals fuse into one
//!    weighted directional verdict per instrument.
//! 3. **Risk** (`risk`): verdicts become sized, stop-protected order
//!    proposals, then the batch is admitted against the shared
//!    per-cycle risk budget and exposure ceiling.
//! 4. **Execution** (`engine`): admitted orders are submitted
//!    concurrently with idempotency keys; every decision gets a
//!    terminal outcome in the cycle report.
//!
//! The `policy` module holds the live parameter set consulted by
//! stages 2-3 and applies bounded deltas from the learning service.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

/// Typed clients for downstream collaborator services.
pub mod clients;

/// Configuration loading and validation.
pub mod config;

/// The orchestration cycle.
pub mod engine;

/// Error taxonomy.
pub mod error;

/// Domain models: signals, verdicts, decisions, orders, reports.
pub mod models;

/// Structured logging setup.
pub mod observability;

/// Live trading policy and learning deltas.
pub mod policy;

/// Retry and circuit breaking for downstream calls.
pub mod resilience;

/// Per-trade assessment and portfolio-level admission.
pub mod risk;

/// Weighted verdict synthesis.
pub mod synthesis;

pub use engine::DecisionEngine;
pub use error::EngineError;
