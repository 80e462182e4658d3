//! Wallet: a Lightning wallet connection, referenced by `Expert::wallet_id`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wallet {
    pub id: i64,
    pub name: String,
    /// Opaque Nostr Wallet Connect string used to instantiate a
    /// `PaymentBackend`.
    pub nwc: String,
    #[serde(default)]
    pub default: bool,
}
