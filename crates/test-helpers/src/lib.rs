//! Test helpers for podrelay.
//!
//! Provides a bridge target driven by the inner request bytes, envelope
//! builders and address/block fixtures, so scheduler and simulator tests
//! can script job outcomes without a real destination contract.

use podrelay_core::{BlockContext, BridgeTarget, ForwardOutcome, ForwardRequest, GasMeter};
use podrelay_types::{Address, BlockHeight, ChainId, Hash, JobPayload};
use std::time::Duration;

// ═══════════════════════════════════════════════════════════════════════════
// Fixtures
// ═══════════════════════════════════════════════════════════════════════════

/// Deterministic address for a label.
pub fn address(label: &str) -> Address {
    Address::derive(label.as_bytes())
}

/// `n` deterministic addresses `"{prefix}-0"`, `"{prefix}-1"`, ...
pub fn addresses(prefix: &str, n: usize) -> Vec<Address> {
    (0..n).map(|i| address(&format!("{prefix}-{i}"))).collect()
}

/// Block at `height` with a timestamp of `secs` seconds and entropy derived
/// from the height.
pub fn block(height: u64, secs: u64) -> BlockContext {
    BlockContext::new(
        BlockHeight(height),
        Duration::from_secs(secs),
        Hash::from_parts(&[b"parent".as_slice(), &height.to_le_bytes()]),
    )
}

// ═══════════════════════════════════════════════════════════════════════════
// Inner requests
// ═══════════════════════════════════════════════════════════════════════════

const OP_SUCCEED: u8 = 0x00;
const OP_REVERT: u8 = 0x01;
const OP_BURN: u8 = 0x02;

/// Inner request that succeeds after spending `gas`.
pub fn inner_ok(gas: u32) -> Vec<u8> {
    let mut inner = vec![OP_SUCCEED];
    inner.extend_from_slice(&gas.to_be_bytes());
    inner
}

/// Inner request that reverts.
pub fn inner_revert() -> Vec<u8> {
    vec![OP_REVERT]
}

/// Inner request that spends all the gas it is given.
pub fn inner_burn() -> Vec<u8> {
    vec![OP_BURN]
}

/// Builder for job envelopes.
#[derive(Debug, Clone)]
pub struct PayloadBuilder {
    payload: JobPayload,
}

impl Default for PayloadBuilder {
    fn default() -> Self {
        Self {
            payload: JobPayload {
                nonce: 0,
                from_chain: ChainId(2),
                inner: inner_ok(21_000),
                gas_limit: 200_000,
                gas_price: 1_000_000_000,
            },
        }
    }
}

impl PayloadBuilder {
    /// Start from a successful 21k-gas inner request.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nonce(mut self, nonce: u64) -> Self {
        self.payload.nonce = nonce;
        self
    }

    pub fn from_chain(mut self, chain: ChainId) -> Self {
        self.payload.from_chain = chain;
        self
    }

    pub fn inner(mut self, inner: Vec<u8>) -> Self {
        self.payload.inner = inner;
        self
    }

    pub fn gas_limit(mut self, gas_limit: u64) -> Self {
        self.payload.gas_limit = gas_limit;
        self
    }

    pub fn gas_price(mut self, gas_price: u128) -> Self {
        self.payload.gas_price = gas_price;
        self
    }

    /// The decoded envelope.
    pub fn payload(&self) -> &JobPayload {
        &self.payload
    }

    /// Encode to wire bytes.
    pub fn build(&self) -> Vec<u8> {
        self.payload.encode()
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Scripted bridge target
// ═══════════════════════════════════════════════════════════════════════════

/// A request the target applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied {
    pub job_hash: Hash,
    pub executor: Address,
    pub inner: Vec<u8>,
}

/// Bridge target whose behaviour is chosen by the first inner byte.
///
/// - `0x00` + `u32` BE: spend that much gas and succeed
/// - `0x01`: revert
/// - `0x02`: spend everything and fail out of gas
/// - anything else: fail as unrecognised
///
/// Successful requests are recorded in order; failures leave no record.
#[derive(Debug, Clone, Default)]
pub struct ScriptedBridgeTarget {
    applied: Vec<Applied>,
    forwards: usize,
}

impl ScriptedBridgeTarget {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests applied so far.
    pub fn applied(&self) -> &[Applied] {
        &self.applied
    }

    /// Forward calls received so far, including failures.
    pub fn forwards(&self) -> usize {
        self.forwards
    }
}

impl BridgeTarget for ScriptedBridgeTarget {
    fn forward(&mut self, request: &ForwardRequest<'_>, meter: &mut GasMeter) -> ForwardOutcome {
        self.forwards += 1;
        match request.inner.split_first() {
            Some((&OP_SUCCEED, rest)) => {
                let gas = rest
                    .get(..4)
                    .and_then(|b| <[u8; 4]>::try_from(b).ok())
                    .map(u32::from_be_bytes)
                    .unwrap_or(0);
                if let Err(err) = meter.charge(gas as u64) {
                    return ForwardOutcome::Failed {
                        reason: err.to_string(),
                    };
                }
                self.applied.push(Applied {
                    job_hash: request.job_hash,
                    executor: request.executor,
                    inner: request.inner.to_vec(),
                });
                ForwardOutcome::Ok
            }
            Some((&OP_REVERT, _)) => ForwardOutcome::Failed {
                reason: "reverted".to_string(),
            },
            Some((&OP_BURN, _)) => {
                let limit = meter.remaining();
                let _ = meter.charge(limit.saturating_add(1));
                ForwardOutcome::Failed {
                    reason: "out of gas".to_string(),
                }
            }
            _ => ForwardOutcome::Failed {
                reason: "unrecognised request".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(inner: &[u8]) -> ForwardRequest<'_> {
        ForwardRequest {
            job_hash: Hash::from_bytes(b"job"),
            from_chain: ChainId(2),
            nonce: 0,
            inner,
            executor: address("executor"),
        }
    }

    #[test]
    fn test_scripted_outcomes() {
        let mut target = ScriptedBridgeTarget::new();
        let mut meter = GasMeter::new(100_000);

        let ok = inner_ok(30_000);
        assert!(target.forward(&request(&ok), &mut meter).is_ok());
        assert_eq!(meter.used(), 30_000);

        assert!(!target.forward(&request(&inner_revert()), &mut meter).is_ok());
        assert_eq!(meter.used(), 30_000);

        assert!(!target.forward(&request(&inner_burn()), &mut meter).is_ok());
        assert_eq!(meter.remaining(), 0);

        assert_eq!(target.applied().len(), 1);
        assert_eq!(target.forwards(), 3);
    }

    #[test]
    fn test_success_over_budget_fails() {
        let mut target = ScriptedBridgeTarget::new();
        let mut meter = GasMeter::new(10);
        let ok = inner_ok(11);
        assert!(!target.forward(&request(&ok), &mut meter).is_ok());
        assert!(target.applied().is_empty());
    }

    #[test]
    fn test_builder_roundtrips() {
        let builder = PayloadBuilder::new().nonce(7).gas_price(3);
        let decoded = JobPayload::decode(&builder.build()).unwrap();
        assert_eq!(&decoded, builder.payload());
    }
}
