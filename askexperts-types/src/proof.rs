//! Proof: client to expert, evidence of payment.

use serde::{Deserialize, Serialize};

use crate::event::EventId;

pub type ProofId = EventId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentMethod {
    Lightning,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Proof {
    pub proof_id: ProofId,
    /// The quote this proof is binding evidence for.
    pub quote_id: EventId,
    pub method: PaymentMethod,
    /// Hex-encoded payment preimage.
    pub preimage: String,
}
