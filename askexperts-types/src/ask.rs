//! Ask: a client's public, anonymized question announcement.

use serde::{Deserialize, Serialize};

use crate::event::{EventId, Pubkey};

/// The ask event's id doubles as the session identifier for its lifetime.
pub type AskId = EventId;

/// Published by a client under an ephemeral key pair, never reused across
/// asks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ask {
    pub ask_id: AskId,
    /// Public, anonymized description of what's being asked.
    pub summary: String,
    pub hashtags: Vec<String>,
    /// Directed ask: only these experts should consider it.
    #[serde(default)]
    pub expert_pubkeys: Vec<Pubkey>,
    #[serde(default)]
    pub max_bid_sats: Option<u64>,
    /// Hex-encoded X25519 public key of the ask's ephemeral key pair, used
    /// by a bidding expert to wrap the session key into the first prompt's
    /// reply path. Derived from the same key pair as `pubkey`, never reused
    /// across asks.
    pub client_x25519_pub: Pubkey,
}

impl Ask {
    /// At least one of `hashtags` or `expert_pubkeys` must be present;
    /// callers validate this before publishing (`INVALID_ARGUMENT`
    /// otherwise).
    pub fn is_addressable(&self) -> bool {
        !self.hashtags.is_empty() || !self.expert_pubkeys.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addressable_requires_hashtags_or_pubkeys() {
        let bare = Ask {
            ask_id: "a1".into(),
            summary: "anonymized".into(),
            hashtags: vec![],
            expert_pubkeys: vec![],
            max_bid_sats: None,
            client_x25519_pub: "x".repeat(64),
        };
        assert!(!bare.is_addressable());

        let tagged = Ask {
            hashtags: vec!["ai".into()],
            ..bare.clone()
        };
        assert!(tagged.is_addressable());
    }
}
