//! Transport unit shared by every relay-carried message.

use serde::{Deserialize, Serialize};

/// Hex-encoded sha256 of an event's canonical bytes.
pub type EventId = String;

/// Hex-encoded ed25519 public key.
pub type Pubkey = String;

/// Relay event kinds in use by the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    /// Public anonymized ask, broadcast by an ephemeral client key.
    Ask,
    /// Expert's bid in reply to an ask.
    Bid,
    /// Encrypted prompt, client to expert.
    Prompt,
    /// Priced quote, expert to client.
    Quote,
    /// Payment proof, client to expert.
    Proof,
    /// Reply chunk, expert to client.
    Reply,
    /// Public expert profile.
    Profile,
}

/// A single `tag` entry: `["e", "<event-id>"]`, `["p", "<pubkey>"]`, etc.
pub type Tag = Vec<String>;

/// An immutable, signed blob as observed from the relay network. The core
/// logic treats this as opaque transport; it never mutates a `SignedEvent`
/// after it has been received or produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedEvent {
    pub id: EventId,
    pub pubkey: Pubkey,
    pub created_at: i64,
    pub kind: EventKind,
    #[serde(default)]
    pub tags: Vec<Tag>,
    pub content: String,
    pub sig: String,
}

impl SignedEvent {
    /// First value of the first tag named `name`, e.g. `tag("e")` for the
    /// referenced event id.
    pub fn tag(&self, name: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|t| t.first().map(String::as_str) == Some(name))
            .and_then(|t| t.get(1))
            .map(String::as_str)
    }

    /// All values tagged `name`, preserving relay order.
    pub fn tags_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> {
        self.tags
            .iter()
            .filter(move |t| t.first().map(String::as_str) == Some(name))
            .filter_map(|t| t.get(1).map(String::as_str))
    }
}

/// Fields of an event prior to id assignment and signing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnsignedEvent {
    pub pubkey: Pubkey,
    pub created_at: i64,
    pub kind: EventKind,
    pub tags: Vec<Tag>,
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SignedEvent {
        SignedEvent {
            id: "abc".into(),
            pubkey: "client-eph".into(),
            created_at: 0,
            kind: EventKind::Prompt,
            tags: vec![
                vec!["p".into(), "expert1".into()],
                vec!["e".into(), "bid1".into()],
            ],
            content: "encrypted".into(),
            sig: "sig".into(),
        }
    }

    #[test]
    fn tag_lookup() {
        let ev = sample();
        assert_eq!(ev.tag("p"), Some("expert1"));
        assert_eq!(ev.tag("e"), Some("bid1"));
        assert_eq!(ev.tag("missing"), None);
    }

    #[test]
    fn kind_round_trips_through_json() {
        let ev = sample();
        let json = serde_json::to_string(&ev).unwrap();
        let back: SignedEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back.kind, EventKind::Prompt);
    }
}
