//! Job envelope carried by the messaging adapter.
//!
//! # Wire Format
//!
//! ```text
//! [version:u8][nonce:u64 BE][from_chain:u32 BE][inner ...][gas_limit:u64 BE][gas_price:u128 BE]
//! ```
//!
//! The inner request is opaque and is forwarded verbatim to the bridge
//! target. Gas limit and gas price ride in a fixed-size trailer so the inner
//! length is implied by the total length.
//!
//! The job hash is computed over the exact envelope bytes, so the source
//! chain and the destination chain must agree byte-for-byte.

use crate::{Amount, ChainId, Hash};
use thiserror::Error;

/// Current envelope version.
pub const PAYLOAD_VERSION: u8 = 1;

/// Bytes before the inner request.
pub const HEADER_LEN: usize = 1 + 8 + 4;

/// Bytes after the inner request.
pub const TRAILER_LEN: usize = 8 + 16;

/// Errors that can occur while decoding an envelope.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadError {
    #[error("Payload too short: {0} bytes")]
    TooShort(usize),

    #[error("Unsupported payload version: {0}")]
    UnsupportedVersion(u8),
}

/// A decoded job envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobPayload {
    /// Outbound nonce assigned on the source chain.
    pub nonce: u64,

    /// Chain the job originated from.
    pub from_chain: ChainId,

    /// Opaque bridge-in request.
    pub inner: Vec<u8>,

    /// Gas the sender paid for on the source chain.
    pub gas_limit: u64,

    /// Gas price the sender paid for on the source chain.
    pub gas_price: u128,
}

impl JobPayload {
    /// Encode to wire bytes.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN + self.inner.len() + TRAILER_LEN);
        out.push(PAYLOAD_VERSION);
        out.extend_from_slice(&self.nonce.to_be_bytes());
        out.extend_from_slice(&self.from_chain.0.to_be_bytes());
        out.extend_from_slice(&self.inner);
        out.extend_from_slice(&self.gas_limit.to_be_bytes());
        out.extend_from_slice(&self.gas_price.to_be_bytes());
        out
    }

    /// Decode from wire bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self, PayloadError> {
        if bytes.len() < HEADER_LEN + TRAILER_LEN {
            return Err(PayloadError::TooShort(bytes.len()));
        }
        if bytes[0] != PAYLOAD_VERSION {
            return Err(PayloadError::UnsupportedVersion(bytes[0]));
        }

        let (header, rest) = bytes.split_at(HEADER_LEN);
        let (inner, trailer) = rest.split_at(rest.len() - TRAILER_LEN);

        let mut nonce = [0u8; 8];
        nonce.copy_from_slice(&header[1..9]);
        let mut from_chain = [0u8; 4];
        from_chain.copy_from_slice(&header[9..13]);
        let mut gas_limit = [0u8; 8];
        gas_limit.copy_from_slice(&trailer[..8]);
        let mut gas_price = [0u8; 16];
        gas_price.copy_from_slice(&trailer[8..]);

        Ok(Self {
            nonce: u64::from_be_bytes(nonce),
            from_chain: ChainId(u32::from_be_bytes(from_chain)),
            inner: inner.to_vec(),
            gas_limit: u64::from_be_bytes(gas_limit),
            gas_price: u128::from_be_bytes(gas_price),
        })
    }

    /// Value of the job: what the sender paid for execution gas.
    pub fn value(&self) -> Amount {
        Amount((self.gas_limit as u128).saturating_mul(self.gas_price))
    }
}

/// Compute the job hash over raw envelope bytes.
pub fn job_hash(payload: &[u8]) -> Hash {
    Hash::from_bytes(payload)
}
