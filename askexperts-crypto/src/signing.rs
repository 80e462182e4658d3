//! Event signing and validation.

use ed25519_dalek::{Signature, Signer, Verifier};
use sha2::{Digest, Sha256};

use askexperts_types::{SignedEvent, UnsignedEvent};

use crate::keys::{KeyPair, PublicKeyHex};
use crate::{CryptoError, CryptoResult};

/// Canonical byte representation an event's id and signature are computed
/// over: a JSON array of `[pubkey, created_at, kind, tags, content]`. Field
/// order is fixed so two implementations of this crate agree on the id.
fn canonical_bytes(unsigned: &UnsignedEvent) -> Vec<u8> {
    let value = serde_json::json!([
        unsigned.pubkey,
        unsigned.created_at,
        unsigned.kind,
        unsigned.tags,
        unsigned.content,
    ]);
    serde_json::to_vec(&value).expect("canonical event value always serializes")
}

/// Assign an id and signature to an unsigned event.
pub fn sign_event(unsigned: UnsignedEvent, keypair: &KeyPair) -> SignedEvent {
    let bytes = canonical_bytes(&unsigned);
    let id = hex::encode(Sha256::digest(&bytes));
    let signature: Signature = keypair.signing_key().sign(id.as_bytes());

    SignedEvent {
        id,
        pubkey: unsigned.pubkey,
        created_at: unsigned.created_at,
        kind: unsigned.kind,
        tags: unsigned.tags,
        content: unsigned.content,
        sig: hex::encode(signature.to_bytes()),
    }
}

/// Recompute the event id from its fields and verify the signature against
/// `event.pubkey`. Returns `Ok(())` on success.
pub fn validate_event(event: &SignedEvent) -> CryptoResult<()> {
    let unsigned = UnsignedEvent {
        pubkey: event.pubkey.clone(),
        created_at: event.created_at,
        kind: event.kind,
        tags: event.tags.clone(),
        content: event.content.clone(),
    };
    let expected_id = hex::encode(Sha256::digest(canonical_bytes(&unsigned)));
    if expected_id != event.id {
        return Err(CryptoError::InvalidSignature);
    }

    let verifying_key = PublicKeyHex(event.pubkey.clone()).to_verifying_key()?;
    let sig_bytes = hex::decode(&event.sig).map_err(|_| CryptoError::InvalidSignature)?;
    let sig_bytes: [u8; 64] = sig_bytes
        .try_into()
        .map_err(|_| CryptoError::InvalidSignature)?;
    let signature = Signature::from_bytes(&sig_bytes);

    verifying_key
        .verify(event.id.as_bytes(), &signature)
        .map_err(|_| CryptoError::InvalidSignature)
}
