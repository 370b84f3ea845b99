//! Operator selection.
//!
//! A job's assignee and fallback order are a pure function of the pod's
//! member list and a seed. The seed comes from a [`SelectionBeacon`] bound to
//! the job's content, so nobody can replay a favourable draw for another
//! payload, and anyone can recompute the assignment afterwards.

use podrelay_core::{SelectionBeacon, SelectionInput, SelectionProof};
use podrelay_types::{fallback_rotation_seed, Address, CryptoError, Hash, KeyPair, PublicKey};

/// Assignee and fallback order of a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    /// First right of execution, `Address::ZERO` for an empty pod.
    pub operator: Address,
    /// Distinct members eligible after each elapsed window, in order.
    pub fallback_operators: Vec<Address>,
}

/// Draw an assignment from a pod of `len` members.
///
/// The assignee is `members[seed mod len]`. Fallback `i` starts at
/// `members[rotation_seed(i) mod len]` and probes forward past the assignee
/// and members already chosen, so the list is always distinct.
pub fn assign<F>(len: usize, member_at: F, seed: &Hash, max_fallbacks: usize) -> Assignment
where
    F: Fn(usize) -> Option<Address>,
{
    let pick = |seed: &Hash| seed.index_below(len);

    let operator = match len {
        0 => None,
        _ => member_at(pick(seed)),
    };
    let Some(operator) = operator else {
        return Assignment {
            operator: Address::ZERO,
            fallback_operators: Vec::new(),
        };
    };

    let wanted = max_fallbacks.min(len - 1);
    let mut fallback_operators = Vec::with_capacity(wanted);
    let mut round = 0u32;
    while fallback_operators.len() < wanted {
        let chosen = fallback_operators.len();
        let mut index = pick(&fallback_rotation_seed(seed, round));
        round += 1;
        for _ in 0..len {
            match member_at(index) {
                Some(candidate)
                    if candidate != operator && !fallback_operators.contains(&candidate) =>
                {
                    fallback_operators.push(candidate);
                    break;
                }
                _ => index = (index + 1) % len,
            }
        }
        if fallback_operators.len() == chosen {
            break;
        }
    }

    Assignment {
        operator,
        fallback_operators,
    }
}

/// Draw an assignment from a member slice.
pub fn assign_from(members: &[Address], seed: &Hash, max_fallbacks: usize) -> Assignment {
    assign(members.len(), |i| members.get(i).copied(), seed, max_fallbacks)
}

// ═══════════════════════════════════════════════════════════════════════════
// Beacons
// ═══════════════════════════════════════════════════════════════════════════

/// Seeds from the parent block's entropy combined with the job.
///
/// Anyone can verify a draw. The block producer can bias it by choosing
/// which block to build, so this suits tests and permissioned hosts.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockEntropyBeacon;

impl SelectionBeacon for BlockEntropyBeacon {
    fn name(&self) -> &'static str {
        "block-entropy"
    }

    fn draw(&self, input: &SelectionInput) -> SelectionProof {
        SelectionProof {
            seed: Hash::from_bytes(&input.message()),
            signature: None,
        }
    }

    fn verify(&self, input: &SelectionInput, proof: &SelectionProof) -> bool {
        proof.signature.is_none() && proof.seed == Hash::from_bytes(&input.message())
    }
}

/// Seeds from a BLS signature over the selection message.
///
/// BLS signatures are unique per key and message, so the seed
/// `blake3(signature)` is fixed once the job exists, cannot be predicted
/// without the beacon key, and can be checked by anyone with the public key.
#[derive(Debug, Clone)]
pub struct BlsBeacon {
    key: KeyPair,
    public_key: PublicKey,
}

impl BlsBeacon {
    /// Create a beacon from a key pair.
    pub fn new(key: KeyPair) -> Self {
        let public_key = key.public_key();
        Self { key, public_key }
    }

    /// Create a beacon from deterministic key material.
    pub fn from_seed(seed: &[u8; 32]) -> Result<Self, CryptoError> {
        KeyPair::from_seed(seed).map(Self::new)
    }

    /// Key observers verify draws with.
    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }
}

/// Check a BLS beacon draw with only the public key.
pub fn verify_bls_draw(
    public_key: &PublicKey,
    input: &SelectionInput,
    proof: &SelectionProof,
) -> bool {
    let Some(signature) = &proof.signature else {
        return false;
    };
    public_key.verify(&input.message(), signature)
        && proof.seed == Hash::from_bytes(signature.as_bytes())
}

impl SelectionBeacon for BlsBeacon {
    fn name(&self) -> &'static str {
        "bls"
    }

    fn draw(&self, input: &SelectionInput) -> SelectionProof {
        let signature = self.key.sign(&input.message());
        SelectionProof {
            seed: Hash::from_bytes(signature.as_bytes()),
            signature: Some(signature),
        }
    }

    fn verify(&self, input: &SelectionInput, proof: &SelectionProof) -> bool {
        verify_bls_draw(&self.public_key, input, proof)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use podrelay_types::BlockHeight;
    use std::collections::HashSet;

    fn members(n: usize) -> Vec<Address> {
        (0..n)
            .map(|i| Address::derive(format!("member-{i}").as_bytes()))
            .collect()
    }

    fn input(nonce: u64) -> SelectionInput {
        SelectionInput {
            job_hash: Hash::from_bytes(b"job"),
            job_nonce: nonce,
            height: BlockHeight(42),
            entropy: Hash::from_bytes(b"parent"),
        }
    }

    #[test]
    fn test_empty_pod_assigns_nobody() {
        let assignment = assign_from(&[], &Hash::from_bytes(b"seed"), 5);
        assert_eq!(assignment.operator, Address::ZERO);
        assert!(assignment.fallback_operators.is_empty());
    }

    #[test]
    fn test_single_member_has_no_fallbacks() {
        let pod = members(1);
        let assignment = assign_from(&pod, &Hash::from_bytes(b"seed"), 5);
        assert_eq!(assignment.operator, pod[0]);
        assert!(assignment.fallback_operators.is_empty());
    }

    #[test]
    fn test_fallbacks_distinct_and_exclude_assignee() {
        let pod = members(8);
        for i in 0..50u32 {
            let seed = Hash::from_bytes(&i.to_le_bytes());
            let assignment = assign_from(&pod, &seed, 5);

            assert!(pod.contains(&assignment.operator));
            assert_eq!(assignment.fallback_operators.len(), 5);
            let unique: HashSet<_> = assignment.fallback_operators.iter().collect();
            assert_eq!(unique.len(), 5);
            assert!(!assignment.fallback_operators.contains(&assignment.operator));
            for fallback in &assignment.fallback_operators {
                assert!(pod.contains(fallback));
            }
        }
    }

    #[test]
    fn test_small_pod_uses_every_other_member() {
        let pod = members(3);
        let assignment = assign_from(&pod, &Hash::from_bytes(b"seed"), 5);
        assert_eq!(assignment.fallback_operators.len(), 2);
    }

    #[test]
    fn test_assignee_is_seed_mod_len() {
        let pod = members(7);
        let seed = Hash::from_bytes(b"seed");
        let assignment = assign_from(&pod, &seed, 0);
        assert_eq!(assignment.operator, pod[seed.index_below(7)]);
    }

    #[test]
    fn test_block_entropy_beacon_verifies() {
        let beacon = BlockEntropyBeacon;
        let proof = beacon.draw(&input(1));
        assert!(beacon.verify(&input(1), &proof));
        assert!(!beacon.verify(&input(2), &proof));
        assert_ne!(proof.seed, beacon.draw(&input(2)).seed);
    }

    #[test]
    fn test_bls_beacon_draw_is_unique_and_verifiable() {
        let beacon = BlsBeacon::from_seed(&[9u8; 32]).unwrap();
        let twin = BlsBeacon::from_seed(&[9u8; 32]).unwrap();
        let stranger = BlsBeacon::from_seed(&[10u8; 32]).unwrap();

        let proof = beacon.draw(&input(1));
        assert_eq!(proof, twin.draw(&input(1)));
        assert_ne!(proof.seed, stranger.draw(&input(1)).seed);

        assert!(verify_bls_draw(beacon.public_key(), &input(1), &proof));
        assert!(!verify_bls_draw(beacon.public_key(), &input(2), &proof));
        assert!(!verify_bls_draw(stranger.public_key(), &input(1), &proof));

        let forged = SelectionProof {
            seed: Hash::from_bytes(b"chosen"),
            signature: proof.signature.clone(),
        };
        assert!(!beacon.verify(&input(1), &forged));
    }
}
