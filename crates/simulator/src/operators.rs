//! Simulated operator population.

use crate::config::OperatorMix;
use podrelay_types::Address;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How an operator behaves when it could execute a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatorProfile {
    /// Executes its own jobs and takes fallback slots.
    Reliable,
    /// Ignores its own jobs but takes fallback slots, collecting the slash.
    Lazy,
    /// Never executes.
    Offline,
}

impl OperatorProfile {
    /// Whether the operator executes jobs assigned to it.
    pub fn serves_assignments(self) -> bool {
        matches!(self, OperatorProfile::Reliable)
    }

    /// Whether the operator takes fallback slots.
    pub fn serves_fallbacks(self) -> bool {
        !matches!(self, OperatorProfile::Offline)
    }

    pub fn type_name(self) -> &'static str {
        match self {
            OperatorProfile::Reliable => "reliable",
            OperatorProfile::Lazy => "lazy",
            OperatorProfile::Offline => "offline",
        }
    }
}

/// A simulated operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimOperator {
    pub address: Address,
    pub profile: OperatorProfile,
}

/// All operators of a run, indexed by address.
#[derive(Debug, Clone, Default)]
pub struct OperatorSet {
    operators: Vec<SimOperator>,
    by_address: HashMap<Address, usize>,
}

impl OperatorSet {
    /// Create the population described by `mix`.
    ///
    /// Addresses are derived from the profile name and index, so the same
    /// mix always yields the same operators.
    pub fn from_mix(mix: &OperatorMix) -> Self {
        let mut set = Self::default();
        for (profile, count) in [
            (OperatorProfile::Reliable, mix.reliable),
            (OperatorProfile::Lazy, mix.lazy),
            (OperatorProfile::Offline, mix.offline),
        ] {
            for i in 0..count {
                let label = format!("{}-operator-{i}", profile.type_name());
                set.push(SimOperator {
                    address: Address::derive(label.as_bytes()),
                    profile,
                });
            }
        }
        set
    }

    fn push(&mut self, operator: SimOperator) {
        self.by_address
            .insert(operator.address, self.operators.len());
        self.operators.push(operator);
    }

    /// Profile of `address`, `None` for non-operators.
    pub fn profile(&self, address: &Address) -> Option<OperatorProfile> {
        self.by_address
            .get(address)
            .map(|&i| self.operators[i].profile)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SimOperator> {
        self.operators.iter()
    }

    pub fn len(&self) -> usize {
        self.operators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mix_is_deterministic() {
        let mix = OperatorMix {
            reliable: 2,
            lazy: 1,
            offline: 1,
        };
        let a = OperatorSet::from_mix(&mix);
        let b = OperatorSet::from_mix(&mix);

        assert_eq!(a.len(), 4);
        let addresses: Vec<_> = a.iter().map(|o| o.address).collect();
        assert_eq!(addresses, b.iter().map(|o| o.address).collect::<Vec<_>>());

        let lazy = a.iter().find(|o| o.profile == OperatorProfile::Lazy).unwrap();
        assert_eq!(a.profile(&lazy.address), Some(OperatorProfile::Lazy));
        assert_eq!(a.profile(&Address::derive(b"stranger")), None);
    }

    #[test]
    fn test_profile_behaviour() {
        assert!(OperatorProfile::Reliable.serves_assignments());
        assert!(!OperatorProfile::Lazy.serves_assignments());
        assert!(OperatorProfile::Lazy.serves_fallbacks());
        assert!(!OperatorProfile::Offline.serves_fallbacks());
    }
}
