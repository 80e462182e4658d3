//! Bid: an expert's response to an Ask.

use serde::{Deserialize, Serialize};

use crate::event::{EventId, Pubkey};

pub type BidId = EventId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bid {
    pub bid_id: BidId,
    pub expert_pubkey: Pubkey,
    /// Short free-text pitch.
    pub offer: String,
    /// Optional public headline price; informational only, the binding
    /// price is always the invoice presented at quote time.
    #[serde(default)]
    pub bid_sats: Option<u64>,
    /// Relays further session traffic for this bid must use.
    pub relays: Vec<String>,
    /// Hex-encoded X25519 public key the client wraps the session key to
    /// on the first prompt of this bid's session.
    pub expert_x25519_pub: Pubkey,
    /// Pre-issued invoice for the headline bid, if any.
    #[serde(default)]
    pub invoice: Option<String>,
    #[serde(default)]
    pub payment_hash: Option<String>,
}
