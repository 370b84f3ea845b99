//! Core seams for podrelay: Call, Notification, RelayError and the
//! StateMachine trait.
//!
//! Everything the scheduler exchanges with its host passes through the types
//! in this crate. The external collaborators (bridge target, account
//! directory, selection beacon) are traits here so the scheduler can be
//! driven by a production host or by the deterministic simulator alike.

mod accounts;
mod beacon;
mod bridge;
mod call;
mod context;
mod error;
mod gas;
mod notification;
mod traits;

pub use accounts::{AccountDirectory, StaticAccounts};
pub use beacon::{SelectionBeacon, SelectionInput, SelectionProof};
pub use bridge::{BridgeTarget, ForwardOutcome, ForwardRequest};
pub use call::{Call, CallReceipt, Genesis, GenesisBalance, GenesisBond};
pub use context::{BlockContext, CallContext};
pub use error::{ErrorKind, RelayError};
pub use gas::{GasMeter, GasSchedule, OutOfGas};
pub use notification::{Notification, TransferReason};
pub use traits::StateMachine;
