//! Bid logic: the one capability an embedder injects into the *idle*
//! transition. Everything after a bid (pricing, proof verification) is
//! engine-owned; reply generation is the `ReplyGenerator`/`ContextProvider`
//! boundary in `askexperts-adapters`.

use async_trait::async_trait;
use askexperts_types::Ask;

/// An expert's expression of interest, handed to the engine to publish as
/// a `K_BID` event.
#[derive(Debug, Clone)]
pub struct ExpertBid {
    pub offer: String,
    /// Informational headline price; the binding price is always the
    /// invoice presented at quote time.
    pub bid_sats: Option<u64>,
}

#[async_trait]
pub trait ExpertHooks: Send + Sync {
    /// Returns `Some` to bid, `None` to ignore the ask. Called only after
    /// the engine has confirmed the ask is addressed to this expert
    /// (hashtag match or explicit `expert_pubkeys`).
    async fn bid(&self, ask: &Ask) -> Option<ExpertBid>;
}

/// Always bids with a generic pitch and no headline price, deferring the
/// binding price to the quote. Useful for tests and experts that don't
/// need ask-specific bid logic.
pub struct AlwaysBidHooks {
    pub offer: String,
}

impl AlwaysBidHooks {
    pub fn new(offer: impl Into<String>) -> Self {
        Self { offer: offer.into() }
    }
}

#[async_trait]
impl ExpertHooks for AlwaysBidHooks {
    async fn bid(&self, _ask: &Ask) -> Option<ExpertBid> {
        Some(ExpertBid {
            offer: self.offer.clone(),
            bid_sats: None,
        })
    }
}
