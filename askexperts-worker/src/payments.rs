//! Wallet-keyed payment backend multiplexing: one `PaymentBackend` per
//! distinct `nwc_string`, shared by every `ExpertInstance` using that
//! wallet (mirrors `openibank-escrow`'s injected-collaborator-by-handle
//! shape: a trait an embedder implements, plus an in-memory default).

use std::collections::HashMap;
use std::sync::Arc;

use askexperts_payments::{InMemoryPaymentBackend, PaymentBackend};
use tokio::sync::RwLock;

/// Builds a `PaymentBackend` for a wallet's NWC connection string. A real
/// deployment implements this against whatever NWC client it embeds; this
/// workspace carries no such client (out of scope), so the only concrete
/// implementation here is the in-memory test double.
pub trait PaymentBackendFactory: Send + Sync {
    fn build(&self, nwc_string: &str) -> Arc<dyn PaymentBackend>;
}

/// Every distinct `nwc_string` gets a fresh, independent in-memory ledger.
pub struct InMemoryPaymentBackendFactory;

impl PaymentBackendFactory for InMemoryPaymentBackendFactory {
    fn build(&self, _nwc_string: &str) -> Arc<dyn PaymentBackend> {
        Arc::new(InMemoryPaymentBackend::new())
    }
}

/// Caches backends by `nwc_string` so experts sharing a wallet share one
/// backend instance instead of one per expert.
pub struct PaymentBackendCache {
    factory: Arc<dyn PaymentBackendFactory>,
    backends: RwLock<HashMap<String, Arc<dyn PaymentBackend>>>,
}

impl PaymentBackendCache {
    pub fn new(factory: Arc<dyn PaymentBackendFactory>) -> Self {
        Self {
            factory,
            backends: RwLock::new(HashMap::new()),
        }
    }

    pub async fn get(&self, nwc_string: &str) -> Arc<dyn PaymentBackend> {
        if let Some(existing) = self.backends.read().await.get(nwc_string) {
            return existing.clone();
        }
        let mut backends = self.backends.write().await;
        backends
            .entry(nwc_string.to_string())
            .or_insert_with(|| self.factory.build(nwc_string))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn same_nwc_string_shares_one_backend() {
        let cache = PaymentBackendCache::new(Arc::new(InMemoryPaymentBackendFactory));
        let a = cache.get("nostr+walletconnect://wallet-a").await;
        let b = cache.get("nostr+walletconnect://wallet-a").await;
        let c = cache.get("nostr+walletconnect://wallet-b").await;

        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
    }
}
