pub use askexperts_types::AskExpertsError as WorkerError;
pub type WorkerResult<T> = std::result::Result<T, WorkerError>;
