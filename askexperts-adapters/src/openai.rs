//! Thin adapter that reshapes an OPENAI-format prompt into the plain
//! `ReplyGenerator` contract, matching the tagged-variant redesign: TEXT
//! carries UTF-8, OPENAI carries a typed chat-completion payload.

use std::sync::Arc;

use async_trait::async_trait;
use askexperts_types::{ChatMessage, PromptContent};

use crate::context::ContextChunk;
use crate::error::{AdapterError, AdapterResult};
use crate::reply::{ReplyGenerator, ReplyStream};

/// Wraps an inner generator that only understands a flat chat-message
/// list, accepting both prompt formats by normalizing TEXT into a single
/// user message first.
pub struct OpenAiCompatAdapter {
    inner: Arc<dyn ChatCompletionGenerator>,
}

/// The narrower contract an OpenAI-compatible backend actually exposes.
#[async_trait]
pub trait ChatCompletionGenerator: Send + Sync {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        context: &[ContextChunk],
    ) -> AdapterResult<ReplyStream>;
}

impl OpenAiCompatAdapter {
    pub fn new(inner: Arc<dyn ChatCompletionGenerator>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl ReplyGenerator for OpenAiCompatAdapter {
    async fn generate(
        &self,
        content: &PromptContent,
        context: &[ContextChunk],
    ) -> AdapterResult<ReplyStream> {
        match content {
            PromptContent::Openai { messages } => self.inner.complete(messages, context).await,
            PromptContent::Text { text } => {
                let messages = vec![ChatMessage {
                    role: "user".into(),
                    content: text.clone(),
                }];
                self.inner.complete(&messages, context).await
            }
        }
    }
}

/// Parses raw decrypted/decompressed prompt bytes into `PromptContent`
/// according to the declared format, erroring `UNSUPPORTED_FORMAT` for
/// anything else.
pub fn decode_prompt_content(
    format: askexperts_types::PromptFormat,
    plaintext: &[u8],
) -> AdapterResult<PromptContent> {
    match format {
        askexperts_types::PromptFormat::Text => {
            let text = String::from_utf8(plaintext.to_vec())
                .map_err(|e| AdapterError::UnsupportedFormat(e.to_string()))?;
            Ok(PromptContent::Text { text })
        }
        askexperts_types::PromptFormat::Openai => {
            serde_json::from_slice(plaintext).map_err(|e| AdapterError::UnsupportedFormat(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream::{self, StreamExt};

    struct Echo;

    #[async_trait]
    impl ChatCompletionGenerator for Echo {
        async fn complete(
            &self,
            messages: &[ChatMessage],
            _context: &[ContextChunk],
        ) -> AdapterResult<ReplyStream> {
            let last = messages.last().map(|m| m.content.clone()).unwrap_or_default();
            Ok(Box::pin(stream::once(async move {
                Ok(crate::reply::ReplyChunk {
                    text: last,
                    done: true,
                })
            })))
        }
    }

    #[tokio::test]
    async fn text_prompt_is_wrapped_as_a_single_user_message() {
        let adapter = OpenAiCompatAdapter::new(Arc::new(Echo));
        let content = PromptContent::Text {
            text: "hello".into(),
        };
        let mut stream = adapter.generate(&content, &[]).await.unwrap();
        let chunk = stream.next().await.unwrap().unwrap();
        assert_eq!(chunk.text, "hello");
        assert!(chunk.done);
    }

    #[test]
    fn decode_rejects_invalid_openai_payload() {
        let err = decode_prompt_content(askexperts_types::PromptFormat::Openai, b"not json");
        assert!(err.is_err());
    }
}
