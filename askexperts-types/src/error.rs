//! Error taxonomy for the AskExperts protocol engine.

use thiserror::Error;

/// Result type for protocol-engine operations.
pub type Result<T> = std::result::Result<T, AskExpertsError>;

/// Errors surfaced across the session engine, relay pool, scheduler and
/// payment backend. Variant names match the error kinds named in the
/// protocol's error-handling design.
#[derive(Debug, Clone, Error)]
pub enum AskExpertsError {
    // Input
    #[error("invalid argument: {reason}")]
    InvalidArgument { reason: String },

    #[error("session not found for ask {ask_id}")]
    SessionNotFound { ask_id: String },

    #[error("unsupported prompt format: {format}")]
    UnsupportedFormat { format: String },

    // Crypto
    #[error("invalid signature")]
    InvalidSignature,

    #[error("decrypt failure")]
    DecryptFailure,

    #[error("unknown compression method: {method}")]
    UnknownCompression { method: String },

    // Transport
    #[error("relay publish failed: no relay accepted the event")]
    RelayPublishFailed,

    #[error("relay wait timed out after {elapsed_ms} ms")]
    RelayTimeout { elapsed_ms: u64 },

    // Protocol
    #[error("quote rejected")]
    QuoteRejected,

    #[error("quote wait timed out after {elapsed_ms} ms")]
    QuoteTimeout { elapsed_ms: u64 },

    #[error("reply wait timed out after {elapsed_ms} ms")]
    ReplyTimeout { elapsed_ms: u64 },

    #[error("bad proof: {reason}")]
    BadProof { reason: String },

    #[error("amount mismatch: expected {expected_msat} msat, got {actual_msat} msat")]
    AmountMismatch { expected_msat: i64, actual_msat: i64 },

    // Payment
    #[error("insufficient balance")]
    InsufficientBalance,

    #[error("route not found")]
    RouteNotFound,

    #[error("payment failed: {reason}")]
    PaymentFailed { reason: String },

    #[error("invoice expired")]
    InvoiceExpired,

    #[error("payment timed out")]
    PaymentTimeout,

    // Scheduling
    #[error("no workers available")]
    NoWorkers,

    #[error("expert {pubkey} failed to start within the timeout")]
    ExpertStartTimeout { pubkey: String },

    #[error("wallet {wallet_id} not found")]
    WalletNotFound { wallet_id: String },

    // General
    #[error("internal error: {message}")]
    Internal { message: String },

    #[error("not implemented: {feature}")]
    NotImplemented { feature: String },
}

impl AskExpertsError {
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Stable code for wire/log propagation, matching the error kind names
    /// used in the protocol's K_REPLY error payloads.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidArgument { .. } => "INVALID_ARGUMENT",
            Self::SessionNotFound { .. } => "SESSION_NOT_FOUND",
            Self::UnsupportedFormat { .. } => "UNSUPPORTED_FORMAT",
            Self::InvalidSignature => "INVALID_SIGNATURE",
            Self::DecryptFailure => "DECRYPT_FAILURE",
            Self::UnknownCompression { .. } => "UNKNOWN_COMPRESSION",
            Self::RelayPublishFailed => "RELAY_PUBLISH_FAILED",
            Self::RelayTimeout { .. } => "RELAY_TIMEOUT",
            Self::QuoteRejected => "QUOTE_REJECTED",
            Self::QuoteTimeout { .. } => "QUOTE_TIMEOUT",
            Self::ReplyTimeout { .. } => "REPLY_TIMEOUT",
            Self::BadProof { .. } => "BAD_PROOF",
            Self::AmountMismatch { .. } => "AMOUNT_MISMATCH",
            Self::InsufficientBalance => "INSUFFICIENT_BALANCE",
            Self::RouteNotFound => "ROUTE_NOT_FOUND",
            Self::PaymentFailed { .. } => "PAYMENT_FAILED",
            Self::InvoiceExpired => "INVOICE_EXPIRED",
            Self::PaymentTimeout => "PAYMENT_TIMEOUT",
            Self::NoWorkers => "NO_WORKERS",
            Self::ExpertStartTimeout { .. } => "EXPERT_START_TIMEOUT",
            Self::WalletNotFound { .. } => "WALLET_NOT_FOUND",
            Self::Internal { .. } => "INTERNAL_ERROR",
            Self::NotImplemented { .. } => "NOT_IMPLEMENTED",
        }
    }

    /// Relay and scheduler-internal failures that a caller may retry;
    /// protocol and payment failures are terminal for the session.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            Self::RelayTimeout { .. } | Self::RouteNotFound | Self::Internal { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_match_protocol_names() {
        assert_eq!(AskExpertsError::QuoteRejected.error_code(), "QUOTE_REJECTED");
        assert_eq!(
            AskExpertsError::AmountMismatch {
                expected_msat: 1000,
                actual_msat: 1002
            }
            .error_code(),
            "AMOUNT_MISMATCH"
        );
    }

    #[test]
    fn retriable_errors() {
        assert!(AskExpertsError::RouteNotFound.is_retriable());
        assert!(!AskExpertsError::QuoteRejected.is_retriable());
    }
}
