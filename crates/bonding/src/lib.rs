//! Bond ledger and pod directory for podrelay operators.
//!
//! Operators stake the utility token to join a pod. Pods are priced by a
//! pluggable [`BondCurve`]; the [`BondLedger`] holds stake in custody,
//! maintains the [`PodDirectory`] and moves stake when an operator is
//! slashed. All state lives in persistent collections so the owner can
//! snapshot and restore it around a call.

mod config;
mod curve;
mod ledger;
mod pods;
mod token;

pub use config::BondingConfig;
pub use curve::{BondCurve, CurveConfig, FlatCurve, ThresholdStepCurve};
pub use ledger::{BondLedger, SlashReport, Stake};
pub use pods::{PodDirectory, MAX_POD_SIZE};
pub use token::TokenLedger;
