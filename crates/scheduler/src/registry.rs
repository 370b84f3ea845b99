//! Job registry.
//!
//! Owns every pending job record, the hashes of resolved jobs and the set of
//! jobs whose inner request failed. A job hash is pending from creation until
//! its first accepted execution; it never becomes pending again.

use podrelay_core::RelayError;
use podrelay_types::{Hash, OperatorJob};

/// Pending, resolved and failed jobs plus the nonces that order them.
#[derive(Debug, Clone, Default)]
pub struct JobRegistry {
    pending: im::HashMap<Hash, OperatorJob>,
    resolved: im::HashSet<Hash>,
    failed: im::HashSet<Hash>,
    job_nonce: u64,
    outbound_nonce: u64,
}

impl JobRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pending job with `job_hash`.
    pub fn get(&self, job_hash: &Hash) -> Option<&OperatorJob> {
        self.pending.get(job_hash)
    }

    /// Pending job with `job_hash`, or the empty sentinel.
    pub fn details(&self, job_hash: &Hash) -> OperatorJob {
        self.get(job_hash).cloned().unwrap_or_default()
    }

    /// Whether `job_hash` is pending.
    pub fn is_pending(&self, job_hash: &Hash) -> bool {
        self.pending.contains_key(job_hash)
    }

    /// Whether `job_hash` was pending once and has been cleared.
    pub fn is_resolved(&self, job_hash: &Hash) -> bool {
        self.resolved.contains(job_hash)
    }

    /// Whether `job_hash` is pending or resolved.
    pub fn is_known(&self, job_hash: &Hash) -> bool {
        self.is_pending(job_hash) || self.is_resolved(job_hash)
    }

    /// Number of pending jobs.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Iterate pending jobs (unordered).
    pub fn pending(&self) -> impl Iterator<Item = (&Hash, &OperatorJob)> {
        self.pending.iter()
    }

    /// Store a new pending job. A hash that was ever stored is refused.
    pub fn insert(&mut self, job_hash: Hash, job: OperatorJob) -> Result<(), RelayError> {
        if self.is_known(&job_hash) {
            return Err(RelayError::JobAlreadyExists);
        }
        self.pending.insert(job_hash, job);
        Ok(())
    }

    /// Clear a pending job, returning its record. The hash stays resolved.
    pub fn clear(&mut self, job_hash: &Hash) -> Option<OperatorJob> {
        let job = self.pending.remove(job_hash)?;
        self.resolved.insert(*job_hash);
        Some(job)
    }

    /// Record that a resolved job's inner request failed.
    pub fn mark_failed(&mut self, job_hash: Hash) {
        self.failed.insert(job_hash);
    }

    /// Whether `job_hash` resolved with a failed inner request and was not
    /// recovered since.
    pub fn is_failed(&self, job_hash: &Hash) -> bool {
        self.failed.contains(job_hash)
    }

    /// Number of unrecovered failed jobs.
    pub fn failed_len(&self) -> usize {
        self.failed.len()
    }

    /// Remove `job_hash` from the failed set. Returns whether it was there.
    pub fn take_failed(&mut self, job_hash: &Hash) -> bool {
        self.failed.remove(job_hash).is_some()
    }

    /// Current job nonce, then advance it.
    pub fn next_job_nonce(&mut self) -> u64 {
        let nonce = self.job_nonce;
        self.job_nonce += 1;
        nonce
    }

    /// Current outbound nonce, then advance it.
    pub fn next_outbound_nonce(&mut self) -> u64 {
        let nonce = self.outbound_nonce;
        self.outbound_nonce += 1;
        nonce
    }

    /// Jobs created so far.
    pub fn job_nonce(&self) -> u64 {
        self.job_nonce
    }

    /// Outbound envelopes sent so far.
    pub fn outbound_nonce(&self) -> u64 {
        self.outbound_nonce
    }
}
