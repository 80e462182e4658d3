pub use askexperts_types::AskExpertsError as SchedulerError;
pub type SchedulerResult<T> = std::result::Result<T, SchedulerError>;
