//! Reply: expert to client, possibly streamed.

use serde::{Deserialize, Serialize};

use crate::event::EventId;

pub type ReplyId = EventId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reply {
    pub reply_id: ReplyId,
    pub proof_id: EventId,
    pub done: bool,
    /// Encrypted, possibly compressed payload. Empty on a pure-error
    /// terminal reply.
    pub content: Vec<u8>,
    /// Offered for the next turn in the same ask, if the expert supports
    /// follow-up without a fresh bid round.
    #[serde(default)]
    pub followup_invoice: Option<String>,
    /// Set instead of (or alongside) `content` when the expert aborted the
    /// prompt, e.g. `BAD_PROOF`.
    #[serde(default)]
    pub error: Option<String>,
}

impl Reply {
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}
