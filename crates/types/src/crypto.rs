//! BLS12-381 keys and signatures for the selection beacon.
//!
//! BLS signatures are unique: for a fixed key and message there is exactly one
//! valid signature. Hashing a beacon signature therefore yields a seed that
//! nobody without the secret key can predict, and that anyone holding the
//! public key can check after the fact.

use std::fmt;

/// Domain separation tag for hash-to-curve (basic scheme, min-pk).
const BLS_DST: &[u8] = b"BLS_SIG_BLS12381G2_XMD:SHA-256_SSWU_RO_NUL_";

/// A BLS12-381 key pair.
#[derive(Clone)]
pub struct KeyPair(blst::min_pk::SecretKey);

impl KeyPair {
    /// Derive a keypair from 32 bytes of seed material.
    pub fn from_seed(seed: &[u8; 32]) -> Result<Self, CryptoError> {
        blst::min_pk::SecretKey::key_gen(seed, &[])
            .map(KeyPair)
            .map_err(|e| CryptoError::KeyGeneration(format!("{:?}", e)))
    }

    /// Sign a message.
    pub fn sign(&self, message: &[u8]) -> Signature {
        let sig = self.0.sign(message, BLS_DST, &[]);
        Signature(sig.to_bytes().to_vec())
    }

    /// Get the public key.
    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.0.sk_to_pk().to_bytes().to_vec())
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyPair({:?})", self.public_key())
    }
}

/// A BLS12-381 public key (48 bytes compressed).
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PublicKey(Vec<u8>);

impl PublicKey {
    /// Verify a signature.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> bool {
        let pk = match blst::min_pk::PublicKey::from_bytes(&self.0) {
            Ok(pk) => pk,
            Err(_) => return false,
        };
        let sig = match blst::min_pk::Signature::from_bytes(&signature.0) {
            Ok(sig) => sig,
            Err(_) => return false,
        };
        sig.verify(true, message, BLS_DST, &[], &pk, true) == blst::BLST_ERROR::BLST_SUCCESS
    }

    /// Get the compressed key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex = hex::encode(&self.0);
        if hex.len() < 16 {
            return write!(f, "PublicKey({})", hex);
        }
        write!(f, "PublicKey({}..{})", &hex[..8], &hex[hex.len() - 8..])
    }
}

/// A BLS12-381 signature (96 bytes compressed).
#[derive(Clone, PartialEq, Eq)]
pub struct Signature(Vec<u8>);

impl Signature {
    /// Wrap raw signature bytes (validated on verification).
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Signature(bytes)
    }

    /// Get signature as byte slice.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex = hex::encode(&self.0);
        write!(f, "Signature({}..)", &hex[..hex.len().min(16)])
    }
}

/// Errors from key handling.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CryptoError {
    /// The BLS library rejected the key material.
    #[error("BLS key generation failed: {0}")]
    KeyGeneration(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bls_sign_verify() {
        let keypair = KeyPair::from_seed(&[42u8; 32]).unwrap();
        let message = b"test message";

        let signature = keypair.sign(message);
        let pubkey = keypair.public_key();

        assert!(pubkey.verify(message, &signature));
        assert!(!pubkey.verify(b"wrong message", &signature));
    }

    #[test]
    fn test_signatures_are_unique_per_key_and_message() {
        let seed = [7u8; 32];
        let kp1 = KeyPair::from_seed(&seed).unwrap();
        let kp2 = KeyPair::from_seed(&seed).unwrap();

        assert_eq!(kp1.sign(b"job"), kp2.sign(b"job"));
        assert_eq!(kp1.public_key(), kp2.public_key());
        assert_ne!(kp1.sign(b"job"), kp1.sign(b"other job"));
    }

    #[test]
    fn test_verify_rejects_garbage_signature() {
        let keypair = KeyPair::from_seed(&[1u8; 32]).unwrap();
        let garbage = Signature::from_bytes(vec![0u8; 12]);
        assert!(!keypair.public_key().verify(b"msg", &garbage));
    }
}
