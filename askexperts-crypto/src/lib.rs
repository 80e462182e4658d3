//! Crypto & Envelope primitives for the AskExperts protocol engine.
//!
//! This crate provides:
//! - Ed25519 key generation and event signing/validation
//! - Conversation-key symmetric encryption (ChaCha20-Poly1305)
//! - X25519 + HKDF asymmetric encryption for the cases where no session
//!   key has been established yet
//! - Compression (gzip) applied before encryption
//!
//! # Security Invariant
//!
//! The session key never leaves the process that created it; nothing in
//! this crate persists a `SessionKey` to disk.

pub mod compression;
pub mod envelope;
pub mod keys;
pub mod signing;

pub use compression::{compress, decompress};
pub use envelope::{decrypt, decrypt_from, encrypt, encrypt_to, SessionKey};
pub use keys::{KeyPair, PublicKeyHex};
pub use signing::{sign_event, validate_event};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("invalid signature")]
    InvalidSignature,

    #[error("decrypt failure: {0}")]
    DecryptFailure(String),

    #[error("unknown compression method: {0}")]
    UnknownCompression(String),

    #[error("invalid key format: {0}")]
    InvalidKeyFormat(String),
}

pub type CryptoResult<T> = Result<T, CryptoError>;

impl From<CryptoError> for askexperts_types::AskExpertsError {
    fn from(err: CryptoError) -> Self {
        use askexperts_types::AskExpertsError;
        match err {
            CryptoError::InvalidSignature => AskExpertsError::InvalidSignature,
            CryptoError::DecryptFailure(_) => AskExpertsError::DecryptFailure,
            CryptoError::UnknownCompression(method) => {
                AskExpertsError::UnknownCompression { method }
            }
            CryptoError::InvalidKeyFormat(reason) => AskExpertsError::InvalidArgument { reason },
        }
    }
}
