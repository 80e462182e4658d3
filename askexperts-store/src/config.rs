//! Store configuration.

#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// sqlx connection string, e.g. `sqlite://askexperts.db` or
    /// `sqlite::memory:` for ephemeral test stores.
    pub database_url: String,
    pub max_connections: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            max_connections: 5,
        }
    }
}

impl StoreConfig {
    pub fn masked_url(&self) -> String {
        match self.database_url.split_once('@') {
            Some((_, host)) => format!("***@{host}"),
            None => self.database_url.clone(),
        }
    }
}
