//! Scenario configuration.
//!
//! A scenario is a TOML file. Every field has a default, so a scenario only
//! names what it changes:
//!
//! ```toml
//! seed = 7
//! blocks = 500
//!
//! [operators]
//! reliable = 12
//! lazy = 4
//! offline = 2
//!
//! [workload]
//! jobs_per_block = 1.5
//! failure_ratio = 0.05
//!
//! [curve]
//! kind = "flat"
//! ```

use crate::SimError;
use podrelay_bonding::{BondingConfig, CurveConfig};
use podrelay_scheduler::SchedulerConfig;
use podrelay_types::Amount;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Configuration for a simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Random seed for deterministic simulation.
    pub seed: u64,

    /// Blocks to produce before draining outstanding jobs.
    pub blocks: u64,

    /// Seconds between blocks.
    pub block_time_secs: u64,

    /// Operator population.
    pub operators: OperatorMix,

    /// Tokens minted to each operator at genesis.
    pub initial_balance: Amount,

    /// Stake each operator bonds at genesis.
    pub stake: Amount,

    /// Job generation.
    pub workload: WorkloadConfig,

    /// Scheduler parameters.
    pub scheduler: SchedulerParams,

    /// Bond curve.
    pub curve: CurveConfig,

    /// Entropy source for assignments.
    pub beacon: BeaconKind,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            seed: 12345,
            blocks: 200,
            block_time_secs: 12,
            operators: OperatorMix::default(),
            initial_balance: Amount::tokens(10_000),
            stake: Amount::tokens(250),
            workload: WorkloadConfig::default(),
            scheduler: SchedulerParams::default(),
            curve: CurveConfig::default(),
            beacon: BeaconKind::default(),
        }
    }
}

impl SimulatorConfig {
    /// Parse a scenario from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, SimError> {
        Ok(toml::from_str(text)?)
    }

    /// Load a scenario file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SimError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| SimError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Render as TOML.
    pub fn to_toml_string(&self) -> Result<String, SimError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Set the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the number of blocks.
    pub fn with_blocks(mut self, blocks: u64) -> Self {
        self.blocks = blocks;
        self
    }

    /// Set the operator population.
    pub fn with_operators(mut self, operators: OperatorMix) -> Self {
        self.operators = operators;
        self
    }

    /// Set the workload.
    pub fn with_workload(mut self, workload: WorkloadConfig) -> Self {
        self.workload = workload;
        self
    }

    /// Set the scheduler parameters.
    pub fn with_scheduler(mut self, scheduler: SchedulerParams) -> Self {
        self.scheduler = scheduler;
        self
    }

    /// Set the beacon.
    pub fn with_beacon(mut self, beacon: BeaconKind) -> Self {
        self.beacon = beacon;
        self
    }

    /// Seconds in a block interval, at least one.
    pub fn block_time(&self) -> Duration {
        Duration::from_secs(self.block_time_secs.max(1))
    }

    /// Build the scheduler configuration this scenario describes.
    pub fn scheduler_config(&self) -> SchedulerConfig {
        let params = &self.scheduler;
        let mut config = SchedulerConfig::default()
            .with_min_gas_price(params.min_gas_price as u128)
            .with_job_window(Duration::from_secs(params.job_window_secs.max(1)))
            .with_max_fallback_operators(params.max_fallback_operators)
            .with_gas_margin_percent(params.gas_margin_percent)
            .with_gas_spike_multiplier(params.gas_spike_multiplier as u128)
            .with_bonding(BondingConfig::default().with_curve(self.curve.build()));
        if !params.pod_value_thresholds.is_empty() {
            config = config.with_pod_value_thresholds(params.pod_value_thresholds.clone());
        }
        config
    }
}

/// How many operators of each profile take part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperatorMix {
    pub reliable: usize,
    pub lazy: usize,
    pub offline: usize,
}

impl Default for OperatorMix {
    fn default() -> Self {
        Self {
            reliable: 8,
            lazy: 3,
            offline: 1,
        }
    }
}

impl OperatorMix {
    /// Total operators.
    pub fn total(&self) -> usize {
        self.reliable + self.lazy + self.offline
    }
}

/// Job generation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkloadConfig {
    /// Mean jobs delivered per block. The fractional part is a probability.
    pub jobs_per_block: f64,

    /// Fraction of jobs whose inner request reverts.
    pub failure_ratio: f64,

    /// Inclusive range of job gas limits.
    pub gas_limit: (u64, u64),

    /// Inclusive range of recorded gas prices.
    pub gas_price: (u64, u64),

    /// Fraction of non-assignee attempts submitted at a spiked gas price.
    pub spike_ratio: f64,

    /// Inclusive range of seconds an operator takes to react.
    pub reaction_secs: (u64, u64),
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            jobs_per_block: 1.0,
            failure_ratio: 0.05,
            gas_limit: (80_000, 400_000),
            gas_price: (1_000_000_000, 20_000_000_000),
            spike_ratio: 0.05,
            reaction_secs: (1, 20),
        }
    }
}

/// Scheduler parameters a scenario may override.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerParams {
    pub job_window_secs: u64,
    pub max_fallback_operators: usize,
    pub gas_margin_percent: u64,
    pub gas_spike_multiplier: u64,
    pub min_gas_price: u64,
    /// Empty keeps the built-in tiers.
    pub pod_value_thresholds: Vec<Amount>,
}

impl Default for SchedulerParams {
    fn default() -> Self {
        let defaults = SchedulerConfig::default();
        Self {
            job_window_secs: defaults.job_window.as_secs(),
            max_fallback_operators: defaults.max_fallback_operators,
            gas_margin_percent: defaults.gas_margin_percent,
            gas_spike_multiplier: defaults.gas_spike_multiplier as u64,
            min_gas_price: defaults.min_gas_price as u64,
            pod_value_thresholds: Vec::new(),
        }
    }
}

/// Which selection beacon the run uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BeaconKind {
    #[default]
    BlockEntropy,
    /// BLS beacon keyed from the run seed.
    Bls,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_scenario_keeps_defaults() {
        let config = SimulatorConfig::from_toml_str(
            r#"
            seed = 7
            beacon = "bls"

            [operators]
            lazy = 10

            [scheduler]
            job_window_secs = 30
            pod_value_thresholds = ["1_000", "2_000"]

            [curve]
            kind = "flat"
            "#,
        )
        .unwrap();

        assert_eq!(config.seed, 7);
        assert_eq!(config.blocks, 200);
        assert_eq!(config.beacon, BeaconKind::Bls);
        assert_eq!(config.operators.lazy, 10);
        assert_eq!(config.operators.reliable, 8);
        assert!(matches!(config.curve, CurveConfig::Flat(_)));

        let scheduler = config.scheduler_config();
        assert_eq!(scheduler.job_window, Duration::from_secs(30));
        assert_eq!(scheduler.max_fallback_operators, 5);
        assert_eq!(
            scheduler.pod_value_thresholds,
            vec![Amount(1_000), Amount(2_000)]
        );
    }

    #[test]
    fn test_defaults_render_and_reload() {
        let config = SimulatorConfig::default().with_seed(99);
        let text = config.to_toml_string().unwrap();
        assert_eq!(SimulatorConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_unknown_beacon_is_rejected() {
        assert!(matches!(
            SimulatorConfig::from_toml_str(r#"beacon = "oracle""#),
            Err(SimError::Parse(_))
        ));
    }
}
