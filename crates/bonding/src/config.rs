//! Configuration for the bond ledger.

use crate::{BondCurve, CurveConfig, MAX_POD_SIZE};
use podrelay_types::Address;
use std::sync::Arc;

/// Configuration for the bond ledger.
#[derive(Debug, Clone)]
pub struct BondingConfig {
    /// Escrow account holding bonded tokens.
    pub custody: Address,

    /// Maximum members per pod, capped at [`MAX_POD_SIZE`].
    pub max_pod_size: usize,

    /// Bond pricing policy.
    pub curve: Arc<dyn BondCurve>,
}

impl Default for BondingConfig {
    fn default() -> Self {
        Self {
            custody: Address::derive(b"podrelay-custody"),
            max_pod_size: MAX_POD_SIZE,
            curve: CurveConfig::default().build(),
        }
    }
}

impl BondingConfig {
    /// Use `custody` as the escrow account.
    pub fn with_custody(mut self, custody: Address) -> Self {
        self.custody = custody;
        self
    }

    /// Limit pods to `max_pod_size` members.
    pub fn with_max_pod_size(mut self, max_pod_size: usize) -> Self {
        self.max_pod_size = max_pod_size.min(MAX_POD_SIZE);
        self
    }

    /// Price bonds with `curve`.
    pub fn with_curve(mut self, curve: Arc<dyn BondCurve>) -> Self {
        self.curve = curve;
        self
    }
}
