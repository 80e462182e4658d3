pub use askexperts_types::AskExpertsError as ExpertError;
pub type ExpertResult<T> = std::result::Result<T, ExpertError>;
