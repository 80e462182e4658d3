//! `ContextProvider`: opaque retrieval boundary. The core never opines on
//! embedding model or vector store; it only consumes ranked chunks.

use async_trait::async_trait;

use crate::error::AdapterResult;

#[derive(Debug, Clone)]
pub struct ContextChunk {
    pub text: String,
    pub score: f32,
}

#[async_trait]
pub trait ContextProvider: Send + Sync {
    async fn context(&self, prompt: &str) -> AdapterResult<Vec<ContextChunk>>;
}

/// Always returns no context; the expert's pricing/quoting logic treats an
/// empty result as "no relevant knowledge" and may decline with a quote
/// error.
pub struct NullContextProvider;

#[async_trait]
impl ContextProvider for NullContextProvider {
    async fn context(&self, _prompt: &str) -> AdapterResult<Vec<ContextChunk>> {
        Ok(Vec::new())
    }
}

/// Fixed fixture, test-only.
pub struct StaticContextProvider {
    chunks: Vec<ContextChunk>,
}

impl StaticContextProvider {
    pub fn new(chunks: Vec<ContextChunk>) -> Self {
        Self { chunks }
    }
}

#[async_trait]
impl ContextProvider for StaticContextProvider {
    async fn context(&self, _prompt: &str) -> AdapterResult<Vec<ContextChunk>> {
        Ok(self.chunks.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn null_provider_yields_nothing() {
        let provider = NullContextProvider;
        assert!(provider.context("anything").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn static_provider_returns_fixture() {
        let provider = StaticContextProvider::new(vec![ContextChunk {
            text: "fact".into(),
            score: 0.9,
        }]);
        let chunks = provider.context("anything").await.unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "fact");
    }
}
