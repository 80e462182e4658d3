//! The `Store` contract: opaque to the core protocol logic but load-bearing
//! for the scheduler's incremental polling and the worker's wallet lookup.

use async_trait::async_trait;
use askexperts_types::{Expert, Wallet};

use crate::error::StoreResult;

#[async_trait]
pub trait Store: Send + Sync {
    async fn get_expert(&self, pubkey: &str) -> StoreResult<Option<Expert>>;

    /// Experts with `timestamp > last_ts`, ordered by timestamp, capped at
    /// `limit` — the scheduler's incremental polling primitive.
    async fn list_experts_after(&self, last_ts: i64, limit: u32) -> StoreResult<Vec<Expert>>;

    async fn put_expert(&self, expert: &Expert) -> StoreResult<()>;

    async fn get_wallet(&self, id: i64) -> StoreResult<Option<Wallet>>;

    async fn list_wallets(&self) -> StoreResult<Vec<Wallet>>;
}
