use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("migration failed: {0}")]
    Migration(String),

    #[error("query failed: {0}")]
    Query(String),

    #[error("expert {pubkey} not found")]
    ExpertNotFound { pubkey: String },

    #[error("wallet {id} not found")]
    WalletNotFound { id: i64 },
}

pub type StoreResult<T> = Result<T, StoreError>;

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Query(err.to_string())
    }
}

impl From<StoreError> for askexperts_types::AskExpertsError {
    fn from(err: StoreError) -> Self {
        use askexperts_types::AskExpertsError;
        match err {
            StoreError::ExpertNotFound { pubkey } => AskExpertsError::SessionNotFound { ask_id: pubkey },
            StoreError::WalletNotFound { id } => AskExpertsError::WalletNotFound {
                wallet_id: id.to_string(),
            },
            other => AskExpertsError::Internal {
                message: other.to_string(),
            },
        }
    }
}
