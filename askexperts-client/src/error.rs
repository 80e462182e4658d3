pub use askexperts_types::AskExpertsError as ClientError;

pub type ClientResult<T> = Result<T, ClientError>;
