//! Boundary to the bridge target a job ultimately invokes.

use crate::GasMeter;
use podrelay_types::{Address, ChainId, Hash};

/// What the scheduler hands to the bridge target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForwardRequest<'a> {
    /// Hash of the job being executed.
    pub job_hash: Hash,

    /// Chain the job came from.
    pub from_chain: ChainId,

    /// Source-chain nonce of the job.
    pub nonce: u64,

    /// Opaque bridge-in request.
    pub inner: &'a [u8],

    /// Address that executed the job.
    pub executor: Address,
}

/// Result of a forward. A failure never unwinds the enclosing call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForwardOutcome {
    /// The inner request applied.
    Ok,
    /// The inner request reverted; its effects are discarded by the target.
    Failed {
        /// Target-supplied reason.
        reason: String,
    },
}

impl ForwardOutcome {
    /// Whether the inner request applied.
    pub fn is_ok(&self) -> bool {
        matches!(self, ForwardOutcome::Ok)
    }
}

/// The contract-call target of executed jobs.
///
/// Implementations charge their own execution to `meter` and must leave
/// their state untouched when returning `Failed`. A target that runs out of
/// gas reports `Failed`.
///
/// Targets are cloned for dry runs, so a clone must be an independent copy.
pub trait BridgeTarget: Clone {
    /// Apply an inner request.
    fn forward(&mut self, request: &ForwardRequest<'_>, meter: &mut GasMeter) -> ForwardOutcome;
}
