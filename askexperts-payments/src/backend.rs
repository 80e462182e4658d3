//! The `PaymentBackend` contract: create invoices, pay them, look up
//! settlement status.

use async_trait::async_trait;
use askexperts_types::Invoice;

use crate::error::PaymentResult;

#[derive(Debug, Clone)]
pub struct LookupResult {
    pub paid: bool,
    pub preimage: Option<String>,
}

#[async_trait]
pub trait PaymentBackend: Send + Sync {
    async fn make_invoice(
        &self,
        amount_sats: u64,
        description: &str,
        expiry_s: u32,
    ) -> PaymentResult<Invoice>;

    /// Returns the hex-encoded preimage on success.
    async fn pay_invoice(&self, bolt11: &str) -> PaymentResult<String>;

    async fn lookup_invoice(&self, payment_hash: &str) -> PaymentResult<LookupResult>;
}
