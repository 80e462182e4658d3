//! `ReplyGenerator`: produces a lazy, finite, ordered stream of reply
//! chunks terminated by the first `done=true` chunk.

use async_trait::async_trait;
use askexperts_types::PromptContent;
use futures::stream::BoxStream;

use crate::context::ContextChunk;
use crate::error::AdapterResult;

#[derive(Debug, Clone)]
pub struct ReplyChunk {
    pub text: String,
    pub done: bool,
}

pub type ReplyStream = BoxStream<'static, AdapterResult<ReplyChunk>>;

/// Operates on the already-decrypted, already-decompressed prompt payload;
/// the session engine owns the envelope and hands this trait plaintext.
#[async_trait]
pub trait ReplyGenerator: Send + Sync {
    async fn generate(
        &self,
        content: &PromptContent,
        context: &[ContextChunk],
    ) -> AdapterResult<ReplyStream>;

    /// Non-streaming convenience: collects `generate`'s stream into one
    /// string. Default implementation, mirroring the stream/non-stream
    /// duality other provider traits in this corpus expose.
    async fn generate_once(
        &self,
        content: &PromptContent,
        context: &[ContextChunk],
    ) -> AdapterResult<String> {
        use futures::StreamExt;
        let mut stream = self.generate(content, context).await?;
        let mut out = String::new();
        while let Some(chunk) = stream.next().await {
            out.push_str(&chunk?.text);
        }
        Ok(out)
    }
}
