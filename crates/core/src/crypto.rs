//! Meta-transaction format: typed-struct digest + Ed25519 verification.
//!
//! A contributor signs a request off-chain; an allow-listed keeper relays
//! it and is paid a fee bounded by the signer's `max_fee`. Replay is
//! prevented by the per-signer nonce checked inside the state transition.

use crate::types::{Address, GardenId};
use crate::{CoreError, Result};
use grove_common::crypto::{sha3_512_bytes, verify_ed25519};
use serde::{Deserialize, Serialize};

/// Domain-separation tag mixed into every request digest.
const REQUEST_DOMAIN_TAG: &[u8] = b"GROVE_SIGNED_REQUEST_V1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestAction {
    Deposit,
    Withdraw,
}

impl RequestAction {
    fn wire_byte(self) -> u8 {
        match self {
            RequestAction::Deposit => 1,
            RequestAction::Withdraw => 2,
        }
    }
}

/// Off-chain-signed deposit/withdraw request relayed by a keeper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedRequest {
    pub action: RequestAction,
    pub garden: GardenId,
    pub amount_in: u128,
    pub min_amount_out: u128,
    pub nonce: u64,
    pub max_fee: u128,
    pub signer: Address,
    /// Opaque reference data bound into the signature.
    pub reference: Vec<u8>,
    /// Ed25519 public key of the signer; the ledger address must derive
    /// from it.
    pub pubkey: [u8; 32],
    /// Ed25519 signature over [`request_digest`].
    pub signature: Vec<u8>,
}

/// Typed-struct hash of a request: a stable field-order encoding under a
/// domain tag. Any field change produces a different digest.
pub fn request_digest(req: &SignedRequest) -> [u8; 64] {
    let mut buf = Vec::with_capacity(128 + req.reference.len());
    buf.extend_from_slice(REQUEST_DOMAIN_TAG);
    buf.push(req.action.wire_byte());
    buf.extend_from_slice(&req.garden.0.to_le_bytes());
    buf.extend_from_slice(&req.amount_in.to_le_bytes());
    buf.extend_from_slice(&req.min_amount_out.to_le_bytes());
    buf.extend_from_slice(&req.nonce.to_le_bytes());
    buf.extend_from_slice(&req.max_fee.to_le_bytes());
    buf.extend_from_slice(req.signer.as_bytes());
    buf.extend_from_slice(&(req.reference.len() as u64).to_le_bytes());
    buf.extend_from_slice(&req.reference);
    sha3_512_bytes(&buf)
}

/// Verify a request's signature and signer binding.
///
/// The claimed ledger address must derive from the presented public key,
/// and the signature must verify over the typed-struct digest.
pub fn verify_request(req: &SignedRequest) -> Result<()> {
    if Address::from_pubkey(&req.pubkey) != req.signer {
        return Err(CoreError::InvalidSignature);
    }
    let digest = request_digest(req);
    let ok = verify_ed25519(&req.pubkey, &digest, &req.signature)
        .map_err(|_| CoreError::InvalidSignature)?;
    if !ok {
        return Err(CoreError::InvalidSignature);
    }
    Ok(())
}
