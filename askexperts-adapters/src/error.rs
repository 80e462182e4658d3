use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("unsupported prompt format: {0}")]
    UnsupportedFormat(String),

    #[error("context retrieval failed: {0}")]
    ContextFailed(String),

    #[error("reply generation failed: {0}")]
    GenerationFailed(String),
}

pub type AdapterResult<T> = Result<T, AdapterError>;

impl From<AdapterError> for askexperts_types::AskExpertsError {
    fn from(err: AdapterError) -> Self {
        use askexperts_types::AskExpertsError;
        match err {
            AdapterError::UnsupportedFormat(format) => AskExpertsError::UnsupportedFormat { format },
            AdapterError::ContextFailed(reason) | AdapterError::GenerationFailed(reason) => {
                AskExpertsError::Internal { message: reason }
            }
        }
    }
}
