//! Quote: expert to client, one or more priced invoices.

use serde::{Deserialize, Serialize};

use crate::event::EventId;

pub type QuoteId = EventId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    /// Payment method, e.g. "lightning".
    pub method: String,
    /// Unit the amount is denominated in, e.g. "sat".
    pub unit: String,
    pub amount: u64,
    /// bolt-11 invoice string.
    pub invoice: String,
    pub payment_hash: String,
}

/// Expert's priced offer for a prompt. May carry `error` instead of (or
/// alongside) invoices when no quote can be offered, e.g. empty retrieval
/// context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    pub quote_id: QuoteId,
    pub prompt_id: EventId,
    #[serde(default)]
    pub invoices: Vec<Invoice>,
    #[serde(default)]
    pub error: Option<String>,
}

impl Quote {
    pub fn is_error(&self) -> bool {
        self.error.is_some() || self.invoices.is_empty()
    }
}
