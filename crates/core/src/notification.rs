//! Notifications emitted to external observers.

use crate::{SelectionInput, SelectionProof};
use podrelay_types::{Address, Amount, ChainId, Hash, PodId};

/// Why stake or tokens moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TransferReason {
    /// Payer → custody on bond.
    Bond,
    /// Payer → custody on top-up.
    Topup,
    /// Custody → recipient on unbond.
    Unbond,
    /// Delinquent assignee → fallback executor.
    Slash,
    /// Custody → operator when slashing removes them from their pod.
    Refund,
}

/// Outbound notifications.
///
/// The host publishes these; operators watch them to discover and validate
/// jobs, and the messaging adapter watches them for outbound payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    // ═══════════════════════════════════════════════════════════════════════
    // Job lifecycle
    // ═══════════════════════════════════════════════════════════════════════
    /// A job was created. Carries the raw payload so any operator can
    /// reconstruct the job hash and execute it.
    AvailableOperatorJob { job_hash: Hash, payload: Vec<u8> },

    /// Assignment evidence for a new job.
    OperatorJobAssigned {
        job_hash: Hash,
        pod: PodId,
        operator: Address,
        fallback_operators: Vec<Address>,
        input: SelectionInput,
        proof: SelectionProof,
    },

    /// A job resolved and its inner request applied.
    FinishedOperatorJob { job_hash: Hash, executor: Address },

    /// A job resolved but its inner request failed.
    FailedOperatorJob { job_hash: Hash },

    /// A failed job was re-forwarded by the admin.
    FailedJobRecovered { job_hash: Hash, succeeded: bool },

    // ═══════════════════════════════════════════════════════════════════════
    // Stake
    // ═══════════════════════════════════════════════════════════════════════
    /// Tokens or stake moved.
    StakeTransfer {
        from: Address,
        to: Address,
        amount: Amount,
        reason: TransferReason,
    },

    // ═══════════════════════════════════════════════════════════════════════
    // Outbound
    // ═══════════════════════════════════════════════════════════════════════
    /// An envelope is ready for the messaging adapter.
    CrossChainMessageSent {
        to_chain: ChainId,
        job_hash: Hash,
        payload: Vec<u8>,
    },
}

impl Notification {
    /// Get a human-readable name for this notification type.
    pub fn type_name(&self) -> &'static str {
        match self {
            Notification::AvailableOperatorJob { .. } => "AvailableOperatorJob",
            Notification::OperatorJobAssigned { .. } => "OperatorJobAssigned",
            Notification::FinishedOperatorJob { .. } => "FinishedOperatorJob",
            Notification::FailedOperatorJob { .. } => "FailedOperatorJob",
            Notification::FailedJobRecovered { .. } => "FailedJobRecovered",
            Notification::StakeTransfer { .. } => "StakeTransfer",
            Notification::CrossChainMessageSent { .. } => "CrossChainMessageSent",
        }
    }

    /// Check if this ends a job's life.
    pub fn is_resolution(&self) -> bool {
        matches!(
            self,
            Notification::FinishedOperatorJob { .. } | Notification::FailedOperatorJob { .. }
        )
    }

    /// Check if this is a stake movement.
    pub fn is_stake(&self) -> bool {
        matches!(self, Notification::StakeTransfer { .. })
    }

    /// Number of data bytes this notification carries, for gas pricing.
    pub fn data_len(&self) -> usize {
        match self {
            Notification::AvailableOperatorJob { payload, .. } => Hash::BYTES + payload.len(),
            Notification::OperatorJobAssigned {
                fallback_operators, ..
            } => Hash::BYTES + 4 + Address::BYTES * (1 + fallback_operators.len()),
            Notification::FinishedOperatorJob { .. } => Hash::BYTES + Address::BYTES,
            Notification::FailedOperatorJob { .. } => Hash::BYTES,
            Notification::FailedJobRecovered { .. } => Hash::BYTES + 1,
            Notification::StakeTransfer { .. } => 2 * Address::BYTES + 16,
            Notification::CrossChainMessageSent { payload, .. } => 4 + Hash::BYTES + payload.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_classification() {
        let hash = Hash::from_bytes(b"job");
        assert!(Notification::FailedOperatorJob { job_hash: hash }.is_resolution());
        assert!(Notification::FinishedOperatorJob {
            job_hash: hash,
            executor: Address::ZERO
        }
        .is_resolution());
        assert!(!Notification::AvailableOperatorJob {
            job_hash: hash,
            payload: vec![]
        }
        .is_resolution());
    }

    #[test]
    fn test_data_len_grows_with_payload() {
        let hash = Hash::from_bytes(b"job");
        let small = Notification::AvailableOperatorJob {
            job_hash: hash,
            payload: vec![0; 4],
        };
        let large = Notification::AvailableOperatorJob {
            job_hash: hash,
            payload: vec![0; 400],
        };
        assert!(large.data_len() > small.data_len());
        assert_eq!(small.type_name(), "AvailableOperatorJob");
    }
}
