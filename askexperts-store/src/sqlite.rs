//! SQLite-backed `Store`. Schema: `experts` keyed by `pubkey` with indices
//! on `wallet_id`, `type`, `timestamp`; `wallets` keyed by integer `id`.

use async_trait::async_trait;
use askexperts_types::{Expert, Wallet};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use tracing::info;

use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::store::Store;

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(config: &StoreConfig) -> StoreResult<Self> {
        info!(url = %config.masked_url(), "connecting to askexperts store");
        // A pooled `:memory:` database is a fresh database per connection, so
        // in-memory stores are pinned to a single connection to keep all
        // queries hitting the same schema.
        let max_connections = if config.database_url.contains(":memory:") {
            1
        } else {
            config.max_connections
        };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(&config.database_url)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> StoreResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS wallets (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                nwc TEXT NOT NULL,
                is_default INTEGER NOT NULL DEFAULT 0
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS experts (
                pubkey TEXT PRIMARY KEY,
                nickname TEXT NOT NULL,
                wallet_id INTEGER NOT NULL,
                type TEXT NOT NULL,
                env TEXT NOT NULL DEFAULT '{}',
                docstores TEXT NOT NULL DEFAULT '[]',
                disabled INTEGER NOT NULL DEFAULT 0,
                timestamp INTEGER NOT NULL,
                privkey TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_experts_wallet_id ON experts(wallet_id)")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_experts_type ON experts(type)")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_experts_timestamp ON experts(timestamp)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    fn row_to_expert(row: &sqlx::sqlite::SqliteRow) -> StoreResult<Expert> {
        let env_raw: String = row.try_get("env")?;
        let docstores_raw: String = row.try_get("docstores")?;
        Ok(Expert {
            pubkey: row.try_get("pubkey")?,
            nickname: row.try_get("nickname")?,
            wallet_id: row.try_get("wallet_id")?,
            expert_type: row.try_get("type")?,
            env: serde_json::from_str(&env_raw).unwrap_or(serde_json::Value::Null),
            docstores: serde_json::from_str(&docstores_raw).unwrap_or_default(),
            disabled: row.try_get::<i64, _>("disabled")? != 0,
            timestamp: row.try_get("timestamp")?,
            privkey: row.try_get("privkey")?,
        })
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn get_expert(&self, pubkey: &str) -> StoreResult<Option<Expert>> {
        let row = sqlx::query("SELECT * FROM experts WHERE pubkey = ?")
            .bind(pubkey)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::row_to_expert).transpose()
    }

    async fn list_experts_after(&self, last_ts: i64, limit: u32) -> StoreResult<Vec<Expert>> {
        let rows = sqlx::query(
            "SELECT * FROM experts WHERE timestamp > ? ORDER BY timestamp ASC LIMIT ?",
        )
        .bind(last_ts)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::row_to_expert).collect()
    }

    async fn put_expert(&self, expert: &Expert) -> StoreResult<()> {
        let env_raw = serde_json::to_string(&expert.env).unwrap_or_else(|_| "{}".into());
        let docstores_raw = serde_json::to_string(&expert.docstores).unwrap_or_else(|_| "[]".into());
        sqlx::query(
            r#"
            INSERT INTO experts (pubkey, nickname, wallet_id, type, env, docstores, disabled, timestamp, privkey)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(pubkey) DO UPDATE SET
                nickname = excluded.nickname,
                wallet_id = excluded.wallet_id,
                type = excluded.type,
                env = excluded.env,
                docstores = excluded.docstores,
                disabled = excluded.disabled,
                timestamp = excluded.timestamp,
                privkey = excluded.privkey
            "#,
        )
        .bind(&expert.pubkey)
        .bind(&expert.nickname)
        .bind(expert.wallet_id)
        .bind(&expert.expert_type)
        .bind(env_raw)
        .bind(docstores_raw)
        .bind(expert.disabled as i64)
        .bind(expert.timestamp)
        .bind(&expert.privkey)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_wallet(&self, id: i64) -> StoreResult<Option<Wallet>> {
        let row = sqlx::query("SELECT id, name, nwc, is_default FROM wallets WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => Ok(Some(Wallet {
                id: row.try_get("id")?,
                name: row.try_get("name")?,
                nwc: row.try_get("nwc")?,
                default: row.try_get::<i64, _>("is_default")? != 0,
            })),
            None => Ok(None),
        }
    }

    async fn list_wallets(&self) -> StoreResult<Vec<Wallet>> {
        let rows = sqlx::query("SELECT id, name, nwc, is_default FROM wallets")
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter()
            .map(|row| {
                Ok(Wallet {
                    id: row.try_get("id")?,
                    name: row.try_get("name")?,
                    nwc: row.try_get("nwc")?,
                    default: row.try_get::<i64, _>("is_default")? != 0,
                })
            })
            .collect()
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
    async fn put_then_get_expert_round_trips() {
        let store = SqliteStore::connect(&StoreConfig::default()).await.unwrap();
        store.put_expert(&sample_expert("pk1", 100)).await.unwrap();
        let found = store.get_expert("pk1").await.unwrap().unwrap();
        assert_eq!(found.nickname, "demo");
    }

    #[tokio::test]
    async fn list_experts_after_is_incremental() {
        let store = SqliteStore::connect(&StoreConfig::default()).await.unwrap();
        store.put_expert(&sample_expert("pk1", 100)).await.unwrap();
        store.put_expert(&sample_expert("pk2", 200)).await.unwrap();

        let after_100 = store.list_experts_after(100, 10).await.unwrap();
        assert_eq!(after_100.len(), 1);
        assert_eq!(after_100[0].pubkey, "pk2");

        let after_0 = store.list_experts_after(0, 10).await.unwrap();
        assert_eq!(after_0.len(), 2);
    }
}
