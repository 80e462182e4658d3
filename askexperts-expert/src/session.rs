//! Per-bid session state: *idle (pre-bid) → awaiting_prompt → quoting →
//! awaiting_proof → serving → idle*, collapsed into the phases actually
//! worth holding state for once a bid has been offered.

use askexperts_crypto::SessionKey;
use askexperts_types::{BidId, EventId, Invoice, Pubkey, PromptContent, Quote};

/// An expert session only exists from the moment a bid is offered (the
/// engine has no state for asks it declined).
pub enum SessionPhase {
    /// Bid sent; waiting for the matching prompt.
    AwaitingPrompt,
    /// Quote published; waiting for payment proof. `quoted_at` drives
    /// [`crate::engine::ExpertEngine::expire_stale_sessions`].
    AwaitingProof {
        quote: Quote,
        invoice: Invoice,
        plaintext: PromptContent,
        quoted_at: i64,
    },
}

pub struct ExpertSession {
    pub bid_id: BidId,
    pub client_pubkey: Pubkey,
    pub client_x25519_pub: [u8; 32],
    /// Known once the first prompt's wrapped key has been unwrapped; reused
    /// for every later turn in the same session.
    pub session_key: Option<SessionKey>,
    /// The context id a subsequent prompt must reference to continue this
    /// session: the bid id initially, a reply id after a served turn.
    pub current_context_id: EventId,
    pub relays: Vec<String>,
    pub phase: SessionPhase,
}

impl ExpertSession {
    pub fn new(bid_id: BidId, client_pubkey: Pubkey, client_x25519_pub: [u8; 32], relays: Vec<String>) -> Self {
        Self {
            current_context_id: bid_id.clone(),
            bid_id,
            client_pubkey,
            client_x25519_pub,
            session_key: None,
            relays,
            phase: SessionPhase::AwaitingPrompt,
        }
    }
}
