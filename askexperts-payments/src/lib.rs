//! Payment Backend: create invoices with a payment hash, pay invoices,
//! return preimages, and verify settlement against a quote.

pub mod backend;
pub mod error;
pub mod memory;
pub mod verify;

pub use backend::{LookupResult, PaymentBackend};
pub use error::{PaymentError, PaymentResult};
pub use memory::InMemoryPaymentBackend;
pub use verify::{check_invoice_amount, verify};
