//! Core types for the podrelay operator layer.
//!
//! This crate holds the plain data shared by every other crate: hashes,
//! identifiers, the job envelope codec, the pending-job record and the BLS
//! keys used by the selection beacon. It performs no I/O and holds no state.

mod crypto;
mod hash;
mod identifiers;
mod job;
mod payload;
mod signing;

pub use crypto::{CryptoError, KeyPair, PublicKey, Signature};
pub use hash::{Hash, HexError};
pub use identifiers::{Address, Amount, BlockHeight, ChainId, PodId};
pub use job::{ExecutionWindow, OperatorJob};
pub use payload::{job_hash, JobPayload, PayloadError, HEADER_LEN, PAYLOAD_VERSION, TRAILER_LEN};
pub use signing::{
    fallback_rotation_seed, operator_selection_message, DOMAIN_FALLBACK_ROTATION,
    DOMAIN_OPERATOR_SELECTION,
};
