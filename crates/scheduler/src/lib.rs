//! Job registry and operator scheduler for podrelay.
//!
//! The scheduler is a synchronous [`StateMachine`](podrelay_core::StateMachine):
//! the messaging module delivers job envelopes, a selection beacon seeds
//! the choice of assignee from the job's pod, and executions are gated by
//! exclusivity windows that rotate through fallback operators. Executing on
//! behalf of a delinquent assignee slashes their stake to the executor.
//!
//! # Execution rights
//!
//! | Elapsed windows | May execute |
//! |-----------------|-------------|
//! | 0 | assignee only |
//! | k ≤ fallbacks | assignee, or fallback k while still in the pod |
//! | otherwise | anyone |
//!
//! Jobs without an assignee are open immediately.

mod admin;
mod config;
mod estimator;
mod execution;
mod registry;
mod selection;
mod state;

pub use config::{Roles, SchedulerConfig};
pub use estimator::{GasEstimator, GasQuote};
pub use execution::ExecutionRight;
pub use registry::JobRegistry;
pub use selection::{
    assign, assign_from, verify_bls_draw, Assignment, BlockEntropyBeacon, BlsBeacon,
};
pub use state::OperatorScheduler;
