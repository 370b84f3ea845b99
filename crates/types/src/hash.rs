//! Blake3 digests: job hashes, selection seeds and beacon inputs.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A 32-byte Blake3 digest.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Hash([u8; 32]);

impl Hash {
    /// Encoded size, used when pricing notifications.
    pub const BYTES: usize = 32;

    /// Digest of `bytes`.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(*blake3::hash(bytes).as_bytes())
    }

    /// Digest of the concatenation of `parts`.
    pub fn from_parts(parts: &[&[u8]]) -> Self {
        let mut hasher = blake3::Hasher::new();
        for part in parts {
            hasher.update(part);
        }
        Self(*hasher.finalize().as_bytes())
    }

    /// Parse 64 hex digits, optionally `0x`-prefixed.
    pub fn from_hex(text: &str) -> Result<Self, HexError> {
        let digits = text.strip_prefix("0x").unwrap_or(text);
        let mut bytes = [0u8; 32];
        decode_fixed(digits, &mut bytes)?;
        Ok(Self(bytes))
    }

    /// Lowercase hex without prefix.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Reduce the digest to an index in `0..len`. `len` must be non-zero.
    ///
    /// Uses the first eight bytes read little-endian, so selection from a
    /// seed can be recomputed by anyone holding the seed.
    pub fn index_below(&self, len: usize) -> usize {
        let head = self.0[..8]
            .iter()
            .rev()
            .fold(0u64, |acc, &byte| (acc << 8) | byte as u64);
        (head % len.max(1) as u64) as usize
    }
}

/// Decode exactly `out.len()` bytes of hex.
pub(crate) fn decode_fixed(digits: &str, out: &mut [u8]) -> Result<(), HexError> {
    if digits.len() != out.len() * 2 {
        return Err(HexError::InvalidLength {
            expected: out.len() * 2,
            actual: digits.len(),
        });
    }
    hex::decode_to_slice(digits, out).map_err(|_| HexError::InvalidHex)
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash(0x{}..)", hex::encode(&self.0[..6]))
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

impl Serialize for Hash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Hash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Hash::from_hex(&text).map_err(serde::de::Error::custom)
    }
}

/// Hex parsing failures for hashes and addresses.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HexError {
    #[error("expected {expected} hex digits, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("invalid hex digit")]
    InvalidHex,
}
