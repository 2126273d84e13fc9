//! Live trading policy: effective parameters, bounded learning deltas,
//! and append-only mutation history.

mod store;

pub use store::{PolicyBounds, PolicyDelta, PolicyError, PolicySnapshot, PolicyStore};
