//! Crypto helpers for grove: hashing + Ed25519 signature verification.

use ed25519_dalek::{Signature, VerifyingKey};
use hex::encode as hex_encode;
use sha3::{Digest, Sha3_512};
use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CryptoError {
    #[error("invalid public key bytes")]
    InvalidKey,
    #[error("invalid signature bytes")]
    InvalidSignature,
}

/// compute sha3-512 raw bytes (64 bytes)
pub fn sha3_512_bytes(data: &[u8]) -> [u8; 64] {
    let mut hasher = Sha3_512::new();
    hasher.update(data);
    let sum = hasher.finalize();
    sum.into()
}

/// compute sha3-512 hex string of bytes
pub fn sha3_512_hex(data: &[u8]) -> String {
    hex_encode(sha3_512_bytes(data))
}

/// Verify an Ed25519 signature over `msg`.
///
/// Returns Ok(false) for a well-formed but non-matching signature;
/// malformed key or signature bytes are errors.
pub fn verify_ed25519(
    pubkey_bytes: &[u8],
    msg: &[u8],
    sig_bytes: &[u8],
) -> Result<bool, CryptoError> {
    let pk: [u8; 32] = pubkey_bytes
        .try_into()
        .map_err(|_| CryptoError::InvalidKey)?;
    let vk = VerifyingKey::from_bytes(&pk).map_err(|_| CryptoError::InvalidKey)?;
    let sig: [u8; 64] = sig_bytes
        .try_into()
        .map_err(|_| CryptoError::InvalidSignature)?;
    let sig = Signature::from_bytes(&sig);
    Ok(vk.verify_strict(msg, &sig).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signer, SigningKey};

    #[test]
    fn verify_roundtrip() {
        let sk = SigningKey::from_bytes(&[7u8; 32]);
        let msg = b"grove signed request";
        let sig = sk.sign(msg);
        let ok = verify_ed25519(
            sk.verifying_key().as_bytes(),
            msg,
            sig.to_bytes().as_slice(),
        )
        .unwrap();
        assert!(ok);
    }

    #[test]
    fn verify_rejects_tampered_message() {
        let sk = SigningKey::from_bytes(&[7u8; 32]);
        let sig = sk.sign(b"original");
        let ok = verify_ed25519(
            sk.verifying_key().as_bytes(),
            b"tampered",
            sig.to_bytes().as_slice(),
        )
        .unwrap();
        assert!(!ok);
    }

    #[test]
    fn malformed_key_is_error() {
        let r = verify_ed25519(&[1u8; 5], b"msg", &[0u8; 64]);
        assert_eq!(r, Err(CryptoError::InvalidKey));
    }

    #[test]
    fn sha3_is_stable() {
        let a = sha3_512_hex(b"grove");
        let b = sha3_512_hex(b"grove");
        assert_eq!(a, b);
        assert_eq!(a.len(), 128);
    }
}
