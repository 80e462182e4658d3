//! Key management: ephemeral and stable ed25519 identities.

use crate::{CryptoError, CryptoResult};
use ed25519_dalek::{SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};

/// A key pair for event signing. Clients mint a fresh one per ask
/// (invariant: ephemeral keys are never reused across asks).
#[derive(Clone)]
pub struct KeyPair {
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
}

impl KeyPair {
    /// Generate a new random key pair.
    pub fn generate() -> Self {
        let mut csprng = OsRng;
        let signing_key = SigningKey::generate(&mut csprng);
        let verifying_key = signing_key.verifying_key();
        Self {
            signing_key,
            verifying_key,
        }
    }

    /// Create from existing signing key bytes, e.g. loaded from `Store`.
    pub fn from_bytes(bytes: &[u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(bytes);
        let verifying_key = signing_key.verifying_key();
        Self {
            signing_key,
            verifying_key,
        }
    }

    pub(crate) fn signing_key(&self) -> &SigningKey {
        &self.signing_key
    }

    pub fn verifying_key(&self) -> &VerifyingKey {
        &self.verifying_key
    }

    pub fn public_key_hex(&self) -> PublicKeyHex {
        PublicKeyHex(hex::encode(self.verifying_key.as_bytes()))
    }

    /// Signing key bytes, for secure storage by the caller only.
    pub fn signing_key_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }

    /// X25519 public key derived from this identity's signing key bytes,
    /// used as the Diffie-Hellman counterpart for [`crate::encrypt_to`].
    /// Distinct from the Ed25519 verifying key used for event signatures.
    pub fn x25519_public(&self) -> [u8; 32] {
        use x25519_dalek::{PublicKey as XPublicKey, StaticSecret};
        let secret = StaticSecret::from(self.signing_key_bytes());
        *XPublicKey::from(&secret).as_bytes()
    }
}

/// Hex-encoded ed25519 public key, as carried in `SignedEvent::pubkey`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PublicKeyHex(pub String);

impl PublicKeyHex {
    pub fn to_verifying_key(&self) -> CryptoResult<VerifyingKey> {
        let bytes = hex::decode(&self.0)
            .map_err(|e| CryptoError::InvalidKeyFormat(e.to_string()))?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidKeyFormat("public key must be 32 bytes".into()))?;
        VerifyingKey::from_bytes(&bytes).map_err(|e| CryptoError::InvalidKeyFormat(e.to_string()))
    }
}

impl std::fmt::Display for PublicKeyHex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A fresh random 32-byte secret, used for session keys.
pub fn random_32() -> [u8; 32] {
    let mut buf = [0u8; 32];
    OsRng.fill_bytes(&mut buf);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keypair_generation_yields_64_char_hex() {
        let kp = KeyPair::generate();
        assert_eq!(kp.public_key_hex().0.len(), 64);
    }

    #[test]
    fn keypair_from_bytes_is_deterministic() {
        let kp1 = KeyPair::generate();
        let bytes = kp1.signing_key_bytes();
        let kp2 = KeyPair::from_bytes(&bytes);
        assert_eq!(kp1.public_key_hex(), kp2.public_key_hex());
    }

    #[test]
    fn public_key_hex_round_trips() {
        let kp = KeyPair::generate();
        let hex = kp.public_key_hex();
        let verifying = hex.to_verifying_key().unwrap();
        assert_eq!(kp.verifying_key(), &verifying);
    }
}
