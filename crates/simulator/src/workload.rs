//! Job generation.

use crate::config::WorkloadConfig;
use podrelay_test_helpers::{inner_ok, inner_revert, PayloadBuilder};
use podrelay_types::ChainId;
use rand::Rng;

/// Source chain simulated jobs arrive from.
const SOURCE_CHAIN: ChainId = ChainId(2);

/// A generated job envelope and whether its inner request is meant to fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedJob {
    pub payload: Vec<u8>,
    pub expect_failure: bool,
}

/// Generates inbound job envelopes.
#[derive(Debug, Clone)]
pub struct JobWorkload {
    config: WorkloadConfig,
    nonce: u64,
}

impl JobWorkload {
    pub fn new(config: WorkloadConfig) -> Self {
        Self { config, nonce: 0 }
    }

    /// Envelopes delivered in one block.
    pub fn generate_block(&mut self, rng: &mut impl Rng) -> Vec<GeneratedJob> {
        let mean = self.config.jobs_per_block.max(0.0);
        let mut count = mean.floor() as usize;
        if rng.gen_bool(mean.fract().clamp(0.0, 1.0)) {
            count += 1;
        }
        (0..count).map(|_| self.generate_one(rng)).collect()
    }

    /// A single envelope with a fresh nonce.
    pub fn generate_one(&mut self, rng: &mut impl Rng) -> GeneratedJob {
        let (gas_low, gas_high) = ordered(self.config.gas_limit);
        let (price_low, price_high) = ordered(self.config.gas_price);
        let gas_limit = rng.gen_range(gas_low..=gas_high);
        let expect_failure = rng.gen_bool(self.config.failure_ratio.clamp(0.0, 1.0));

        let inner = if expect_failure {
            inner_revert()
        } else {
            // Leave room under the limit so successful requests fit.
            let spend = (gas_limit / 2).min(u32::MAX as u64) as u32;
            inner_ok(rng.gen_range(0..=spend))
        };

        let nonce = self.nonce;
        self.nonce += 1;
        let payload = PayloadBuilder::new()
            .nonce(nonce)
            .from_chain(SOURCE_CHAIN)
            .inner(inner)
            .gas_limit(gas_limit)
            .gas_price(rng.gen_range(price_low..=price_high) as u128)
            .build();

        GeneratedJob {
            payload,
            expect_failure,
        }
    }

    /// Whether the next non-assignee attempt should carry a spiked price.
    pub fn spike(&self, rng: &mut impl Rng) -> bool {
        rng.gen_bool(self.config.spike_ratio.clamp(0.0, 1.0))
    }

    /// Seconds an operator takes to react.
    pub fn reaction_secs(&self, rng: &mut impl Rng) -> u64 {
        let (low, high) = ordered(self.config.reaction_secs);
        rng.gen_range(low..=high)
    }
}

fn ordered<T: PartialOrd + Copy>((a, b): (T, T)) -> (T, T) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use podrelay_types::JobPayload;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_envelopes_respect_ranges() {
        let config = WorkloadConfig {
            jobs_per_block: 2.5,
            gas_limit: (100_000, 50_000),
            ..WorkloadConfig::default()
        };
        let mut workload = JobWorkload::new(config.clone());
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        let mut nonces = Vec::new();
        for _ in 0..50 {
            let jobs = workload.generate_block(&mut rng);
            assert!((2..=3).contains(&jobs.len()));
            for job in jobs {
                let decoded = JobPayload::decode(&job.payload).unwrap();
                assert!((50_000..=100_000).contains(&decoded.gas_limit));
                assert!(decoded.gas_price >= config.gas_price.0 as u128);
                assert!(decoded.gas_price <= config.gas_price.1 as u128);
                assert_eq!(decoded.from_chain, SOURCE_CHAIN);
                nonces.push(decoded.nonce);
            }
        }
        let expected: Vec<u64> = (0..nonces.len() as u64).collect();
        assert_eq!(nonces, expected);
    }

    #[test]
    fn test_same_seed_same_jobs() {
        let mut a = JobWorkload::new(WorkloadConfig::default());
        let mut b = JobWorkload::new(WorkloadConfig::default());
        let mut rng_a = ChaCha8Rng::seed_from_u64(11);
        let mut rng_b = ChaCha8Rng::seed_from_u64(11);
        for _ in 0..20 {
            assert_eq!(a.generate_one(&mut rng_a), b.generate_one(&mut rng_b));
        }
    }
}
