//! Selection beacon seam.
//!
//! Operator assignment must be unpredictable to any single actor before the
//! job exists, yet checkable by everyone afterwards. A beacon turns a
//! [`SelectionInput`] (bound to the job's content) into a seed plus whatever
//! evidence is needed to verify it.

use podrelay_types::{operator_selection_message, BlockHeight, Hash, Signature};

/// Everything a selection seed is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionInput {
    /// Hash of the job being assigned.
    pub job_hash: Hash,
    /// Monotonic job counter at creation time.
    pub job_nonce: u64,
    /// Height of the creating block.
    pub height: BlockHeight,
    /// Parent-block entropy of the creating block.
    pub entropy: Hash,
}

impl SelectionInput {
    /// Domain-separated message the beacon commits to.
    pub fn message(&self) -> Vec<u8> {
        operator_selection_message(&self.job_hash, self.job_nonce, self.height, &self.entropy)
    }
}

/// A drawn seed and its evidence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionProof {
    /// Seed the assignment is computed from.
    pub seed: Hash,
    /// Beacon signature over the input message, for signing beacons.
    pub signature: Option<Signature>,
}

/// Source of selection seeds.
pub trait SelectionBeacon: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Draw the seed for `input`.
    fn draw(&self, input: &SelectionInput) -> SelectionProof;

    /// Check that `proof` is the seed this beacon draws for `input`.
    fn verify(&self, input: &SelectionInput, proof: &SelectionProof) -> bool;
}
