//! Canonical data model for the AskExperts protocol engine.
//!
//! Types here carry no behavior beyond construction helpers and
//! (de)serialization; the crates implementing each component build their
//! logic on top of these shapes.

pub mod ask;
pub mod bid;
pub mod error;
pub mod event;
pub mod expert;
pub mod prompt;
pub mod proof;
pub mod quote;
pub mod reply;
pub mod summary;
pub mod wallet;

pub use ask::{Ask, AskId};
pub use bid::{Bid, BidId};
pub use error::{AskExpertsError, Result};
pub use event::{EventId, EventKind, Pubkey, SignedEvent, Tag, UnsignedEvent};
pub use expert::{Expert, ExpertState};
pub use prompt::{ChatMessage, Compression, Prompt, PromptContent, PromptFormat, PromptId};
pub use proof::{PaymentMethod, Proof, ProofId};
pub use quote::{Invoice, Quote, QuoteId};
pub use reply::{Reply, ReplyId};
pub use summary::{AskSummary, ExpertOutcome, ExpertResult};
pub use wallet::Wallet;
