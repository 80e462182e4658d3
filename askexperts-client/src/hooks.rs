//! Capability struct replacing the callback-options-bag pattern: each hook
//! documents whether it may suspend (all do) and whether it can veto.

use std::sync::Arc;

use askexperts_payments::PaymentBackend;
use askexperts_types::{AskExpertsError, PaymentMethod, Prompt, Proof, Quote};
use async_trait::async_trait;

pub type HookResult<T> = Result<T, AskExpertsError>;

#[async_trait]
pub trait ClientHooks: Send + Sync {
    /// Present a quote to the caller. Returning `false` aborts the ask with
    /// `QUOTE_REJECTED` before any proof is built.
    async fn on_quote(&self, quote: &Quote) -> bool;

    /// Produce payment proof for an accepted quote.
    async fn on_pay(&self, quote: &Quote, prompt: &Prompt) -> HookResult<Proof>;

    /// Fired when a quote's amount exceeds the configured ceiling, before
    /// `on_pay` runs. Returning `true` proceeds anyway; the default refuses.
    async fn on_max_amount_exceeded(&self, quote: &Quote, max_amount_sats: u64) -> bool {
        let _ = (quote, max_amount_sats);
        false
    }
}

/// Default hook set: accepts every quote and pays the cheapest invoice via
/// a `PaymentBackend`, the behavior the contract names as "the default
/// implementation".
pub struct PaymentBackendHooks {
    backend: Arc<dyn PaymentBackend>,
}

impl PaymentBackendHooks {
    pub fn new(backend: Arc<dyn PaymentBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl ClientHooks for PaymentBackendHooks {
    async fn on_quote(&self, _quote: &Quote) -> bool {
        true
    }

    async fn on_pay(&self, quote: &Quote, _prompt: &Prompt) -> HookResult<Proof> {
        let invoice = quote
            .invoices
            .iter()
            .min_by_key(|inv| inv.amount)
            .ok_or_else(|| AskExpertsError::invalid_argument("quote carries no invoices"))?;

        let preimage = self
            .backend
            .pay_invoice(&invoice.invoice)
            .await
            .map_err(AskExpertsError::from)?;

        Ok(Proof {
            proof_id: String::new(),
            quote_id: quote.quote_id.clone(),
            method: PaymentMethod::Lightning,
            preimage,
        })
    }
}
