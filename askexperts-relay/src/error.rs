use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("no relay accepted the event")]
    PublishFailed,

    #[error("relay wait timed out after {elapsed_ms} ms")]
    Timeout { elapsed_ms: u64 },

    #[error("relay transport error: {0}")]
    Transport(String),
}

pub type RelayResult<T> = Result<T, RelayError>;

impl From<RelayError> for askexperts_types::AskExpertsError {
    fn from(err: RelayError) -> Self {
        use askexperts_types::AskExpertsError;
        match err {
            RelayError::PublishFailed => AskExpertsError::RelayPublishFailed,
            RelayError::Timeout { elapsed_ms } => AskExpertsError::RelayTimeout { elapsed_ms },
            RelayError::Transport(reason) => AskExpertsError::Internal { message: reason },
        }
    }
}
