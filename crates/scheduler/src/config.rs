//! Configuration for the operator scheduler.

use podrelay_bonding::BondingConfig;
use podrelay_core::GasSchedule;
use podrelay_types::{Address, Amount, ChainId, PodId};
use std::time::Duration;

/// Addresses holding privileged roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Roles {
    /// May change configuration, initialize and recover failed jobs.
    pub admin: Address,
    /// Sole caller of inbound job delivery.
    pub messaging_module: Address,
    /// Sole caller of outbound sends.
    pub bridge: Address,
    /// Registry that creates bridgeable assets.
    pub registry: Address,
    /// Token that stake is denominated in.
    pub utility_token: Address,
}

impl Default for Roles {
    fn default() -> Self {
        Self {
            admin: Address::derive(b"podrelay-admin"),
            messaging_module: Address::derive(b"podrelay-messaging"),
            bridge: Address::derive(b"podrelay-bridge"),
            registry: Address::derive(b"podrelay-registry"),
            utility_token: Address::derive(b"podrelay-utility-token"),
        }
    }
}

/// Configuration for the operator scheduler.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Initial role holders.
    pub roles: Roles,

    /// Chain id stamped on outbound envelopes.
    pub local_chain: ChainId,

    /// Floor applied to outbound gas prices and fee quotes.
    pub min_gas_price: u128,

    /// Length of the assignee's exclusive window and of each fallback slot.
    pub job_window: Duration,

    /// Fallback operators recorded per job.
    pub max_fallback_operators: usize,

    /// Execution needs more than `gas_limit × (100 + margin) / 100` gas left.
    pub gas_margin_percent: u64,

    /// Non-assignee calls at or above `recorded price × multiplier` are rejected.
    pub gas_spike_multiplier: u128,

    /// Ascending job-value thresholds. A value below threshold `i` maps to
    /// pod `i + 1`; values at or above the last map to the pod after it.
    pub pod_value_thresholds: Vec<Amount>,

    /// Gas price of each metered operation.
    pub gas: GasSchedule,

    /// Fixed gas added to every quote.
    pub job_base_gas: u64,

    /// Gas added per payload byte to every quote.
    pub job_gas_per_byte: u64,

    /// Bond ledger configuration.
    pub bonding: BondingConfig,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            roles: Roles::default(),
            local_chain: ChainId(1),
            min_gas_price: 0,
            job_window: Duration::from_secs(60),
            max_fallback_operators: 5,
            gas_margin_percent: 10,
            gas_spike_multiplier: 2,
            pod_value_thresholds: vec![
                Amount(10u128.pow(16)),
                Amount(10u128.pow(17)),
                Amount(10u128.pow(18)),
            ],
            gas: GasSchedule::default(),
            job_base_gas: 110_000,
            job_gas_per_byte: 25,
            bonding: BondingConfig::default(),
        }
    }
}

impl SchedulerConfig {
    /// Set the role holders.
    pub fn with_roles(mut self, roles: Roles) -> Self {
        self.roles = roles;
        self
    }

    /// Set the local chain id.
    pub fn with_local_chain(mut self, chain: ChainId) -> Self {
        self.local_chain = chain;
        self
    }

    /// Set the minimum gas price.
    pub fn with_min_gas_price(mut self, price: u128) -> Self {
        self.min_gas_price = price;
        self
    }

    /// Set the exclusivity window length.
    pub fn with_job_window(mut self, window: Duration) -> Self {
        self.job_window = window;
        self
    }

    /// Set how many fallback operators each job records.
    pub fn with_max_fallback_operators(mut self, count: usize) -> Self {
        self.max_fallback_operators = count;
        self
    }

    /// Set the execution gas margin.
    pub fn with_gas_margin_percent(mut self, percent: u64) -> Self {
        self.gas_margin_percent = percent;
        self
    }

    /// Set the gas spike multiplier.
    pub fn with_gas_spike_multiplier(mut self, multiplier: u128) -> Self {
        self.gas_spike_multiplier = multiplier;
        self
    }

    /// Set the pod value thresholds.
    pub fn with_pod_value_thresholds(mut self, thresholds: Vec<Amount>) -> Self {
        self.pod_value_thresholds = thresholds;
        self
    }

    /// Set the bond ledger configuration.
    pub fn with_bonding(mut self, bonding: BondingConfig) -> Self {
        self.bonding = bonding;
        self
    }

    /// Pod whose members serve a job of the given value.
    pub fn pod_for_value(&self, value: Amount) -> PodId {
        let tier = self
            .pod_value_thresholds
            .iter()
            .position(|threshold| value < *threshold)
            .unwrap_or(self.pod_value_thresholds.len());
        PodId(tier as u32 + 1)
    }

    /// Gas that must remain for an execution of a job with `gas_limit`.
    pub fn required_execution_gas(&self, gas_limit: u64) -> u64 {
        let margin = (gas_limit as u128 * self.gas_margin_percent as u128 / 100) as u64;
        gas_limit.saturating_add(margin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pod_for_value() {
        let config = SchedulerConfig::default();
        assert_eq!(config.pod_for_value(Amount::ZERO), PodId(1));
        assert_eq!(config.pod_for_value(Amount(10u128.pow(16) - 1)), PodId(1));
        assert_eq!(config.pod_for_value(Amount(10u128.pow(16))), PodId(2));
        assert_eq!(config.pod_for_value(Amount(10u128.pow(17))), PodId(3));
        assert_eq!(config.pod_for_value(Amount(10u128.pow(30))), PodId(4));

        let single = config.with_pod_value_thresholds(vec![]);
        assert_eq!(single.pod_for_value(Amount(10u128.pow(30))), PodId(1));
    }

    #[test]
    fn test_required_execution_gas() {
        let config = SchedulerConfig::default();
        assert_eq!(config.required_execution_gas(100_000), 110_000);
        assert_eq!(config.required_execution_gas(0), 0);
        assert_eq!(config.required_execution_gas(u64::MAX), u64::MAX);
    }
}
