//! In-process `Store` double for tests — no sqlite dependency.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use askexperts_types::{Expert, Wallet};
use tokio::sync::RwLock;

use crate::error::StoreResult;
use crate::store::Store;

#[derive(Default)]
pub struct InMemoryStore {
    experts: Arc<RwLock<HashMap<String, Expert>>>,
    wallets: Arc<RwLock<HashMap<i64, Wallet>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn seed_wallet(&self, wallet: Wallet) {
        self.wallets.write().await.insert(wallet.id, wallet);
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn get_expert(&self, pubkey: &str) -> StoreResult<Option<Expert>> {
        Ok(self.experts.read().await.get(pubkey).cloned())
    }

    async fn list_experts_after(&self, last_ts: i64, limit: u32) -> StoreResult<Vec<Expert>> {
        let mut experts: Vec<Expert> = self
            .experts
            .read()
            .await
            .values()
            .filter(|e| e.timestamp > last_ts)
            .cloned()
            .collect();
        experts.sort_by_key(|e| e.timestamp);
        experts.truncate(limit as usize);
        Ok(experts)
    }

    async fn put_expert(&self, expert: &Expert) -> StoreResult<()> {
        self.experts
            .write()
            .await
            .insert(expert.pubkey.clone(), expert.clone());
        Ok(())
    }

    async fn get_wallet(&self, id: i64) -> StoreResult<Option<Wallet>> {
        Ok(self.wallets.read().await.get(&id).cloned())
    }

    async fn list_wallets(&self) -> StoreResult<Vec<Wallet>> {
        Ok(self.wallets.read().await.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_expert(pubkey: &str, timestamp: i64) -> Expert {
        Expert {
            pubkey: pubkey.into(),
            nickname: "demo".into(),
            wallet_id: 1,
            expert_type: "rag".into(),
            env: json!({}),
            docstores: vec![],
            disabled: false,
            timestamp,
            privkey: None,
        }
    }

    #[tokio::test]
    async fn list_experts_after_orders_and_caps() {
        let store = InMemoryStore::new();
        store.put_expert(&sample_expert("a", 10)).await.unwrap();
        store.put_expert(&sample_expert("b", 30)).await.unwrap();
        store.put_expert(&sample_expert("c", 20)).await.unwrap();

        let page = store.list_experts_after(5, 2).await.unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].pubkey, "a");
        assert_eq!(page[1].pubkey, "c");
    }

    #[tokio::test]
    async fn seeded_wallet_is_retrievable() {
        let store = InMemoryStore::new();
        store
            .seed_wallet(Wallet {
                id: 1,
                name: "main".into(),
                nwc: "nostr+walletconnect://...".into(),
                default: true,
            })
            .await;
        let wallet = store.get_wallet(1).await.unwrap().unwrap();
        assert!(wallet.default);
    }
}
