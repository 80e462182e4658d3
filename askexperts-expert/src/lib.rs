//! Session Engine — Expert: reacts to incoming asks/prompts/proofs with
//! the bid/quote/proof/reply state machine and the pricing contract.

mod config;
mod engine;
mod error;
mod hooks;
mod pricing;
mod session;

pub use config::{ExpertConfig, ExpertProfile};
pub use engine::ExpertEngine;
pub use error::{ExpertError, ExpertResult};
pub use hooks::{AlwaysBidHooks, ExpertBid, ExpertHooks};
pub use pricing::{estimate_tokens_in, price_sats};
pub use session::{ExpertSession, SessionPhase};
