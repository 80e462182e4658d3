//! Expert: the registry record managed by the scheduler out of `Store`.

use serde::{Deserialize, Serialize};

use crate::event::Pubkey;

/// Lifecycle state the scheduler tracks for a given expert pubkey.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpertState {
    Queued,
    Starting,
    Started,
    Stopping,
    Stopped,
}

/// Registry record, persisted in `Store` and reconciled against scheduler
/// state on every poll tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expert {
    pub pubkey: Pubkey,
    pub nickname: String,
    pub wallet_id: i64,
    /// Expert implementation type, e.g. "openai_proxy", "rag".
    #[serde(rename = "type")]
    pub expert_type: String,
    /// Free-form environment/config blob passed through to the worker.
    #[serde(default)]
    pub env: serde_json::Value,
    #[serde(default)]
    pub docstores: Vec<String>,
    pub disabled: bool,
    /// Monotonic, drives `list_experts_after` incremental polling.
    pub timestamp: i64,
    /// Present only when the scheduler must hand the worker a signing key
    /// out of band; never logged.
    #[serde(default)]
    pub privkey: Option<String>,
}
