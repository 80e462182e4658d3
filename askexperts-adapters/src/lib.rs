//! Context & Reply Adapters: the boundary between a decoded `Prompt` and
//! the opaque retrieval/generation backends the core does not implement.

pub mod context;
pub mod error;
pub mod openai;
pub mod reply;

pub use context::{ContextChunk, ContextProvider, NullContextProvider, StaticContextProvider};
pub use error::{AdapterError, AdapterResult};
pub use openai::OpenAiCompatAdapter;
pub use reply::{ReplyChunk, ReplyGenerator, ReplyStream};
