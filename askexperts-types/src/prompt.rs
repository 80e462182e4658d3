//! Prompt: client to expert, encrypted.

use serde::{Deserialize, Serialize};

use crate::event::{EventId, Pubkey};

pub type PromptId = EventId;

/// Payload shape carried by a prompt's (decrypted) content. TEXT carries
/// opaque UTF-8; OPENAI carries a typed chat-completion request. Unknown
/// formats error with `UNSUPPORTED_FORMAT` before reaching an adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PromptFormat {
    Text,
    Openai,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    None,
    Gzip,
}

/// Plaintext prompt payload, produced after decryption/decompression.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "format")]
pub enum PromptContent {
    #[serde(rename = "TEXT")]
    Text { text: String },
    #[serde(rename = "OPENAI")]
    Openai { messages: Vec<ChatMessage> },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prompt {
    pub prompt_id: PromptId,
    pub expert_pubkey: Pubkey,
    pub format: PromptFormat,
    pub compression: Compression,
    /// Encrypted, possibly compressed, payload bytes.
    pub content: Vec<u8>,
    /// The bid id for the first prompt in a session, or the previous
    /// reply's follow-up id for subsequent prompts.
    pub context_id: EventId,
    /// Session key, asymmetrically wrapped to the bidding expert's
    /// `expert_x25519_pub`. Present only on the first prompt of a session;
    /// later prompts in the same context reuse the expert's cached key.
    #[serde(default)]
    pub wrapped_session_key: Option<Vec<u8>>,
}
