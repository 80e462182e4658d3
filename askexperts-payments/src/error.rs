use thiserror::Error;

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("insufficient balance")]
    InsufficientBalance,

    #[error("route not found")]
    RouteNotFound,

    #[error("invoice expired")]
    InvoiceExpired,

    #[error("payment timed out")]
    PaymentTimeout,

    #[error("invalid invoice: {0}")]
    InvalidInvoice(String),

    #[error("amount mismatch: expected {expected_msat} msat, got {actual_msat} msat")]
    AmountMismatch { expected_msat: i64, actual_msat: i64 },

    #[error("bad proof: {0}")]
    BadProof(String),
}

pub type PaymentResult<T> = Result<T, PaymentError>;

impl From<PaymentError> for askexperts_types::AskExpertsError {
    fn from(err: PaymentError) -> Self {
        use askexperts_types::AskExpertsError;
        match err {
            PaymentError::InsufficientBalance => AskExpertsError::InsufficientBalance,
            PaymentError::RouteNotFound => AskExpertsError::RouteNotFound,
            PaymentError::InvoiceExpired => AskExpertsError::InvoiceExpired,
            PaymentError::PaymentTimeout => AskExpertsError::PaymentTimeout,
            PaymentError::InvalidInvoice(reason) => AskExpertsError::InvalidArgument { reason },
            PaymentError::AmountMismatch {
                expected_msat,
                actual_msat,
            } => AskExpertsError::AmountMismatch {
                expected_msat,
                actual_msat,
            },
            PaymentError::BadProof(reason) => AskExpertsError::BadProof { reason },
        }
    }
}
