//! Expert Worker: hosts `ExpertInstance`s up to capacity, multiplexes
//! payment backends by wallet, and speaks the scheduler's WebSocket frame
//! protocol as a client.

mod components;
mod config;
mod error;
mod instance;
mod payments;
mod transport;
mod worker;

pub use components::{ExpertComponentFactory, ExpertComponents};
pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use instance::ExpertInstance;
pub use payments::{InMemoryPaymentBackendFactory, PaymentBackendCache, PaymentBackendFactory};
pub use worker::Worker;

#[cfg(test)]
mod tests;
