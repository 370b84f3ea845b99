//! Bond pricing per pod.
//!
//! Every pod has a base bond amount, fixed for the pod's lifetime, and a
//! current bond amount that a newcomer must stake. Base amounts strictly
//! increase with the pod number; current amounts never decrease as the pod
//! grows.

use podrelay_types::{Amount, PodId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Pricing policy for bonds.
pub trait BondCurve: fmt::Debug + Send + Sync {
    /// Minimum stake a member of `pod` must keep. Zero for `PodId::NONE`.
    fn base_amount(&self, pod: PodId) -> Amount;

    /// Stake required to join `pod` when it has `population` members.
    fn current_amount(&self, pod: PodId, population: usize) -> Amount;
}

/// `base × multiplier^(pod − 1)`, saturating.
fn geometric_base(base: Amount, multiplier: u32, pod: PodId) -> Amount {
    if pod.is_none() {
        return Amount::ZERO;
    }
    let mut amount = base.get();
    for _ in 1..pod.0 {
        amount = amount.saturating_mul(multiplier as u128);
        if amount == u128::MAX {
            break;
        }
    }
    Amount(amount)
}

/// Bond price rises in steps once a pod passes a population threshold.
///
/// The threshold halves with each pod, so the more expensive pods start
/// charging a premium earlier:
///
/// ```text
/// threshold(p) = threshold >> (p − 1)
/// current(p, n) = base(p) + base(p) / divisor × ⌊(n − threshold(p)) / step⌋   for n > threshold(p)
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdStepCurve {
    /// Base bond of pod 1.
    pub base: Amount,
    /// Factor between consecutive pods' base bonds. Must be at least 2.
    pub multiplier: u32,
    /// Population above which pod 1 charges a premium.
    pub threshold: u64,
    /// Members per premium step.
    pub step: u64,
    /// Premium per step is `base / divisor`.
    pub divisor: u64,
}

impl Default for ThresholdStepCurve {
    fn default() -> Self {
        Self {
            base: Amount::tokens(100),
            multiplier: 2,
            threshold: 1_000,
            step: 10,
            divisor: 100,
        }
    }
}

impl ThresholdStepCurve {
    /// Population threshold of `pod`.
    pub fn threshold_for(&self, pod: PodId) -> u64 {
        if pod.is_none() {
            return self.threshold;
        }
        self.threshold.checked_shr(pod.0 - 1).unwrap_or(0)
    }
}

impl BondCurve for ThresholdStepCurve {
    fn base_amount(&self, pod: PodId) -> Amount {
        geometric_base(self.base, self.multiplier.max(2), pod)
    }

    fn current_amount(&self, pod: PodId, population: usize) -> Amount {
        let base = self.base_amount(pod);
        let threshold = self.threshold_for(pod);
        let population = population as u64;
        if population <= threshold {
            return base;
        }
        let steps = (population - threshold) / self.step.max(1);
        let premium = (base.get() / self.divisor.max(1) as u128).saturating_mul(steps as u128);
        Amount(base.get().saturating_add(premium))
    }
}

/// Bond price never depends on population.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlatCurve {
    /// Base bond of pod 1.
    pub base: Amount,
    /// Factor between consecutive pods' base bonds. Must be at least 2.
    pub multiplier: u32,
}

impl Default for FlatCurve {
    fn default() -> Self {
        Self {
            base: Amount::tokens(100),
            multiplier: 2,
        }
    }
}

impl BondCurve for FlatCurve {
    fn base_amount(&self, pod: PodId) -> Amount {
        geometric_base(self.base, self.multiplier.max(2), pod)
    }

    fn current_amount(&self, pod: PodId, _population: usize) -> Amount {
        self.base_amount(pod)
    }
}

/// Serializable choice of curve, as it appears in configuration files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CurveConfig {
    ThresholdStep(ThresholdStepCurve),
    Flat(FlatCurve),
}

impl Default for CurveConfig {
    fn default() -> Self {
        CurveConfig::ThresholdStep(ThresholdStepCurve::default())
    }
}

impl CurveConfig {
    /// Build the configured curve.
    pub fn build(&self) -> Arc<dyn BondCurve> {
        match self {
            CurveConfig::ThresholdStep(curve) => Arc::new(curve.clone()),
            CurveConfig::Flat(curve) => Arc::new(curve.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_doubles_per_pod() {
        let curve = ThresholdStepCurve::default();
        assert_eq!(curve.base_amount(PodId::NONE), Amount::ZERO);
        assert_eq!(curve.base_amount(PodId(1)), Amount::tokens(100));
        assert_eq!(curve.base_amount(PodId(2)), Amount::tokens(200));
        assert_eq!(curve.base_amount(PodId(4)), Amount::tokens(800));
    }

    #[test]
    fn test_premium_steps_after_threshold() {
        let curve = ThresholdStepCurve::default();
        let pod = PodId(1);
        let base = Amount::tokens(100);

        assert_eq!(curve.current_amount(pod, 0), base);
        assert_eq!(curve.current_amount(pod, 1_000), base);
        assert_eq!(curve.current_amount(pod, 1_009), base);
        assert_eq!(curve.current_amount(pod, 1_010), Amount::tokens(101));
        assert_eq!(curve.current_amount(pod, 1_100), Amount::tokens(110));
    }

    #[test]
    fn test_threshold_halves_per_pod() {
        let curve = ThresholdStepCurve::default();
        assert_eq!(curve.threshold_for(PodId(1)), 1_000);
        assert_eq!(curve.threshold_for(PodId(2)), 500);
        assert_eq!(curve.threshold_for(PodId(3)), 250);
        assert_eq!(curve.threshold_for(PodId(40)), 0);

        // Pod 2 charges its first premium at 510 members.
        assert_eq!(curve.current_amount(PodId(2), 510), Amount::tokens(202));
    }

    #[test]
    fn test_current_is_monotonic_in_population() {
        let curve = ThresholdStepCurve::default();
        let mut last = Amount::ZERO;
        for population in (0..3_000).step_by(7) {
            let current = curve.current_amount(PodId(1), population);
            assert!(current >= last);
            last = current;
        }
    }

    #[test]
    fn test_flat_curve_ignores_population() {
        let curve = FlatCurve::default();
        assert_eq!(curve.current_amount(PodId(3), 0), Amount::tokens(400));
        assert_eq!(curve.current_amount(PodId(3), 60_000), Amount::tokens(400));
    }

    #[test]
    fn test_huge_pod_saturates() {
        let curve = FlatCurve::default();
        assert_eq!(curve.base_amount(PodId(500)), Amount(u128::MAX));
    }

    #[test]
    fn test_config_builds_selected_curve() {
        let curve = CurveConfig::Flat(FlatCurve::default()).build();
        assert_eq!(curve.current_amount(PodId(1), 5_000), Amount::tokens(100));

        let curve = CurveConfig::default().build();
        assert_eq!(curve.current_amount(PodId(1), 5_000), Amount::tokens(500));
    }
}
