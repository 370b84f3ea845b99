//! Gas estimation by dry run.
//!
//! A job's target is arbitrary code, so its cost cannot be derived
//! statically. The estimator instead runs the real resolution path against a
//! clone of the scheduler (persistent-collection snapshot plus a cloned
//! bridge target) and measures what it consumed. The clone is dropped, so an
//! estimate has no observable effect.

use crate::execution::{Eligibility, ExecutionRight};
use crate::OperatorScheduler;
use podrelay_core::{BridgeTarget, ForwardOutcome, GasMeter, Notification, RelayError};
use podrelay_types::{job_hash, Address, Amount, JobPayload};

/// Stands in for the assignee of a payload that has not been delivered, so
/// the estimate includes settling an obligation.
const ESTIMATE_ASSIGNEE_LABEL: &[u8] = b"podrelay-estimate-assignee";

/// Gas quote for a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasQuote {
    /// Gas the dry run consumed.
    pub consumed: u64,
    /// Fixed per-job overhead.
    pub base: u64,
    /// Per-byte overhead over the whole payload.
    pub per_byte: u64,
    /// `consumed + base + per_byte`.
    pub total: u64,
}

/// Turns measured consumption into quotes and fees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasEstimator {
    /// Fixed gas added to every quote.
    pub base_gas: u64,
    /// Gas added per payload byte.
    pub gas_per_byte: u64,
}

impl GasEstimator {
    /// Quote a payload of `payload_len` bytes whose dry run consumed `consumed`.
    pub fn quote(&self, payload_len: usize, consumed: u64) -> GasQuote {
        let per_byte = self.gas_per_byte.saturating_mul(payload_len as u64);
        GasQuote {
            consumed,
            base: self.base_gas,
            per_byte,
            total: consumed.saturating_add(self.base_gas).saturating_add(per_byte),
        }
    }

    /// Fee for a job of `gas_limit` and `payload_len` bytes at
    /// `max(gas_price, min_gas_price)`.
    pub fn fee(
        &self,
        gas_limit: u64,
        gas_price: u128,
        min_gas_price: u128,
        payload_len: usize,
    ) -> Amount {
        let gas = self.quote(payload_len, gas_limit).total;
        Amount((gas as u128).saturating_mul(gas_price.max(min_gas_price)))
    }
}

impl<T: BridgeTarget> OperatorScheduler<T> {
    /// The estimator configured for this scheduler.
    pub fn estimator(&self) -> GasEstimator {
        GasEstimator {
            base_gas: self.config.job_base_gas,
            gas_per_byte: self.config.job_gas_per_byte,
        }
    }

    /// Dry-run the resolution of `payload` with `allowance` gas.
    ///
    /// Returns the gas left afterwards. The run charges what an assignee
    /// execution charges: envelope hash, job read, eligibility read, clear,
    /// settlement, forward and the outcome notification. A payload that is
    /// not pending yet is settled against a placeholder assignee. Running out
    /// of gas yields zero.
    pub fn job_estimator(&self, payload: &[u8], allowance: u64) -> Result<u64, RelayError> {
        let decoded = JobPayload::decode(payload)?;
        let mut sandbox = self.clone();
        let mut meter = GasMeter::new(allowance);
        let mut notifications = Vec::new();

        let _span = tracing::debug_span!("dry_run", allowance).entered();
        match sandbox.dry_run(payload, &decoded, &mut meter, &mut notifications) {
            Ok(_) => Ok(meter.remaining()),
            Err(RelayError::OutOfGas { .. }) => Ok(0),
            Err(error) => Err(error),
        }
    }

    fn dry_run(
        &mut self,
        payload: &[u8],
        decoded: &JobPayload,
        meter: &mut GasMeter,
        out: &mut Vec<Notification>,
    ) -> Result<ForwardOutcome, RelayError> {
        meter.charge(self.config.gas.hash(payload.len()))?;
        let job_hash = job_hash(payload);
        meter.charge(self.config.gas.storage_read)?;
        let mut job = self.state.registry.details(&job_hash);
        if !self.state.registry.is_pending(&job_hash) {
            job.operator = Address::derive(ESTIMATE_ASSIGNEE_LABEL);
        }

        meter.charge(self.config.gas.storage_read)?;
        let eligibility = Eligibility {
            right: ExecutionRight::Assignee,
            executor: job.operator,
        };
        self.resolve(job_hash, &job, decoded, eligibility, meter, out)
    }

    /// Quote `payload`: dry-run consumption plus per-job and per-byte gas.
    pub fn job_quote(&self, payload: &[u8], allowance: u64) -> Result<GasQuote, RelayError> {
        let remaining = self.job_estimator(payload, allowance)?;
        Ok(self
            .estimator()
            .quote(payload.len(), allowance.saturating_sub(remaining)))
    }

    /// Fee a sender pays on the source chain for a job.
    pub fn message_fee(&self, gas_limit: u64, gas_price: u128, payload_len: usize) -> Amount {
        self.estimator()
            .fee(gas_limit, gas_price, self.state.min_gas_price, payload_len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_adds_overheads() {
        let estimator = GasEstimator {
            base_gas: 110_000,
            gas_per_byte: 25,
        };
        let quote = estimator.quote(100, 40_000);
        assert_eq!(quote.per_byte, 2_500);
        assert_eq!(quote.total, 152_500);
    }

    #[test]
    fn test_fee_uses_price_floor() {
        let estimator = GasEstimator {
            base_gas: 100,
            gas_per_byte: 1,
        };
        assert_eq!(estimator.fee(900, 2, 5, 0), Amount(5_000));
        assert_eq!(estimator.fee(900, 7, 5, 0), Amount(7_000));
        assert_eq!(estimator.fee(900, 7, 5, 10), Amount(7_070));
    }
}
