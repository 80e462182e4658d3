//! Conversation-key encryption: symmetric (session key) and asymmetric
//! (ECDH + HKDF) envelopes, both over ChaCha20-Poly1305.

use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Nonce};
use hkdf::Hkdf;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;

use crate::keys::{random_32, KeyPair};
use crate::{CryptoError, CryptoResult};

const NONCE_LEN: usize = 12;

/// 32-byte secret scoped to one ask, held only by the client. Every
/// private payload in the ask's lifetime is encrypted to it.
#[derive(Clone)]
pub struct SessionKey([u8; 32]);

impl SessionKey {
    pub fn generate() -> Self {
        Self(random_32())
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

/// Encrypt `plaintext` to a session key. Output is `nonce || ciphertext`.
pub fn encrypt(plaintext: &[u8], key: &SessionKey) -> CryptoResult<Vec<u8>> {
    seal(plaintext, &key.0)
}

/// Inverse of [`encrypt`].
pub fn decrypt(ciphertext: &[u8], key: &SessionKey) -> CryptoResult<Vec<u8>> {
    open(ciphertext, &key.0)
}

/// Encrypt to a recipient's X25519 public key ([`KeyPair::x25519_public`])
/// using the sender's signing key material as X25519 scalar input. Used
/// before a session key has been established, e.g. a bid acknowledgement
/// channel.
pub fn encrypt_to(plaintext: &[u8], sender: &KeyPair, recipient_x25519_pub: &[u8; 32]) -> CryptoResult<Vec<u8>> {
    let shared = derive_shared_key(sender, recipient_x25519_pub)?;
    seal(plaintext, &shared)
}

/// Inverse of [`encrypt_to`]; `sender_x25519_pub` is the sender's
/// [`KeyPair::x25519_public`].
pub fn decrypt_from(ciphertext: &[u8], recipient: &KeyPair, sender_x25519_pub: &[u8; 32]) -> CryptoResult<Vec<u8>> {
    let shared = derive_shared_key(recipient, sender_x25519_pub)?;
    open(ciphertext, &shared)
}

fn derive_shared_key(local: &KeyPair, remote_pub: &[u8; 32]) -> CryptoResult<[u8; 32]> {
    use x25519_dalek::{PublicKey as XPublicKey, StaticSecret};

    let local_secret = StaticSecret::from(local.signing_key_bytes());
    let remote_public = XPublicKey::from(*remote_pub);
    let shared = local_secret.diffie_hellman(&remote_public);

    let hk = Hkdf::<Sha256>::new(None, shared.as_bytes());
    let mut okm = [0u8; 32];
    hk.expand(b"askexperts-conversation-key", &mut okm)
        .map_err(|e| CryptoError::DecryptFailure(e.to_string()))?;
    Ok(okm)
}

fn seal(plaintext: &[u8], key_bytes: &[u8; 32]) -> CryptoResult<Vec<u8>> {
    let cipher = ChaCha20Poly1305::new(key_bytes.into());
    let mut nonce_bytes = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| CryptoError::DecryptFailure(e.to_string()))?;

    let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

fn open(sealed: &[u8], key_bytes: &[u8; 32]) -> CryptoResult<Vec<u8>> {
    if sealed.len() < NONCE_LEN {
        return Err(CryptoError::DecryptFailure("ciphertext too short".into()));
    }
    let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_LEN);
    let nonce = Nonce::from_slice(nonce_bytes);
    let cipher = ChaCha20Poly1305::new(key_bytes.into());
    cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| CryptoError::DecryptFailure("authentication failed".into()))
}
