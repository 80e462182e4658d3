//! Per-ask session state: the session key, and per-expert contexts that
//! thread `context_id` across turns.

use std::collections::HashMap;

use askexperts_crypto::{KeyPair, SessionKey};
use askexperts_types::{EventId, Pubkey};

/// Tracks one expert's place in an ask's turn sequence. `context_id` starts
/// as the accepted bid's id and becomes the prior reply's follow-up id once
/// a turn completes.
#[derive(Debug, Clone)]
pub struct ExpertContext {
    pub expert_pubkey: Pubkey,
    pub relays: Vec<String>,
    pub context_id: EventId,
    /// The bid's hex-encoded X25519 public key; the session key is wrapped
    /// to it on the first prompt only.
    pub expert_x25519_pub: Pubkey,
    /// Whether the wrapped session key has already been sent to this
    /// expert; gates the one-time `Prompt::wrapped_session_key` payload.
    pub session_key_sent: bool,
    /// Invoice offered for the next turn without a fresh bid round, if any.
    pub followup_invoice: Option<String>,
}

/// One `find_experts` call's worth of state, indexed by `expert_pubkey`
/// within the session (the Open Question this resolves: a session can hold
/// concurrent contexts for every expert a single ask matched).
pub struct AskSession {
    pub session_key: SessionKey,
    /// The ephemeral identity the ask was published under; also signs every
    /// prompt and proof for this ask's lifetime.
    pub keypair: KeyPair,
    pub created_at: i64,
    pub contexts: HashMap<Pubkey, ExpertContext>,
    disposed: bool,
}

impl AskSession {
    pub fn new(session_key: SessionKey, keypair: KeyPair, created_at: i64) -> Self {
        Self {
            session_key,
            keypair,
            created_at,
            contexts: HashMap::new(),
            disposed: false,
        }
    }

    /// Idempotent: repeated calls are no-ops. Relay subscriptions opened
    /// against this session are closed by their own `Subscription::drop`;
    /// this only marks the session key as no longer usable.
    pub fn dispose(&mut self) {
        self.disposed = true;
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }
}
