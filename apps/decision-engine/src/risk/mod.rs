//! Trade risk assessment and portfolio-level admission control.
//!
//! The [`TradeRiskAssessor`] sizes and stop-protects one trade at a
//! time; the [`PortfolioAllocator`] runs a batch of assessed trades
//! against the shared per-cycle risk budget and exposure ceiling. Both
//! append every outcome to the [`AuditLog`].

pub mod allocator;
pub mod assessor;
pub mod audit;

pub use allocator::{AllocatorPolicy, PortfolioAllocator, TradeCandidate};
pub use assessor::{AssessmentRequest, AssessorPolicy, TradeRiskAssessor};
pub use audit::AuditLog;
