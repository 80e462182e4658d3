//! Session Engine — Client: discovers bidding experts for an anonymized
//! ask and drives the strictly ordered prompt/quote/proof/reply sequence
//! against each.

mod client;
mod config;
mod error;
mod hooks;
mod reply;
mod session;

pub use client::Client;
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use hooks::{ClientHooks, HookResult, PaymentBackendHooks};
pub use reply::{ClientReply, ReplyStream};
pub use session::{AskSession, ExpertContext};
