//! Domain-separated messages for operator selection.
//!
//! Selection seeds are derived from messages that carry a unique domain tag
//! prefix, so a beacon signature produced for one purpose can never be
//! replayed as another.
//!
//! | Tag | Purpose |
//! |-----|---------|
//! | `OPERATOR_SELECTION` | Seed for assigning a job to a pod member |
//! | `FALLBACK_ROTATION` | Successive seeds for the fallback order |

use crate::{BlockHeight, Hash};

/// Domain tag for the primary selection seed.
///
/// Format: `OPERATOR_SELECTION` || job_hash || job_nonce || height || entropy
pub const DOMAIN_OPERATOR_SELECTION: &[u8] = b"OPERATOR_SELECTION";

/// Domain tag for fallback rotation seeds.
///
/// Format: `FALLBACK_ROTATION` || seed || round
pub const DOMAIN_FALLBACK_ROTATION: &[u8] = b"FALLBACK_ROTATION";

/// Build the beacon message for a job's primary selection.
pub fn operator_selection_message(
    job_hash: &Hash,
    job_nonce: u64,
    height: BlockHeight,
    entropy: &Hash,
) -> Vec<u8> {
    let mut message = Vec::with_capacity(DOMAIN_OPERATOR_SELECTION.len() + 80);
    message.extend_from_slice(DOMAIN_OPERATOR_SELECTION);
    message.extend_from_slice(job_hash.as_bytes());
    message.extend_from_slice(&job_nonce.to_le_bytes());
    message.extend_from_slice(&height.0.to_le_bytes());
    message.extend_from_slice(entropy.as_bytes());
    message
}

/// Derive the seed for the given fallback round from a selection seed.
pub fn fallback_rotation_seed(seed: &Hash, round: u32) -> Hash {
    Hash::from_parts(&[
        DOMAIN_FALLBACK_ROTATION,
        seed.as_bytes(),
        &round.to_le_bytes(),
    ])
}
