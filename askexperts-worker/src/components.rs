//! Turns an `askexperts_types::Expert` registry record into the
//! collaborators `ExpertEngine::new` needs. The registry record carries a
//! `type`/`env`/`docstores` triple whose interpretation (which retrieval
//! backend, which reply generator) is embedder-specific, so this is an
//! injected factory, the same shape as `ExpertHooks`/`ContextProvider`.

use async_trait::async_trait;
use askexperts_adapters::{ContextProvider, ReplyGenerator};
use askexperts_crypto::KeyPair;
use askexperts_expert::{ExpertConfig, ExpertHooks, ExpertProfile};
use askexperts_types::Expert;
use std::sync::Arc;

use crate::error::WorkerResult;

pub struct ExpertComponents {
    pub keypair: KeyPair,
    pub profile: ExpertProfile,
    pub config: ExpertConfig,
    pub hooks: Arc<dyn ExpertHooks>,
    pub context_provider: Arc<dyn ContextProvider>,
    pub reply_generator: Arc<dyn ReplyGenerator>,
}

#[async_trait]
pub trait ExpertComponentFactory: Send + Sync {
    async fn build(&self, expert: &Expert) -> WorkerResult<ExpertComponents>;
}

/// Reconstructs identity from `Expert::privkey` (hex-encoded signing key
/// bytes). Errors if a hosted expert record carries no `privkey`: the
/// worker has no way to mint one on the fly, since the public key it must
/// serve under is fixed by the registry record it was handed.
fn keypair_from_expert(expert: &Expert) -> WorkerResult<KeyPair> {
    let privkey = expert
        .privkey
        .as_ref()
        .ok_or_else(|| crate::error::WorkerError::invalid_argument("expert record carries no privkey"))?;
    let bytes = hex::decode(privkey).map_err(|e| crate::error::WorkerError::invalid_argument(e.to_string()))?;
    let bytes: [u8; 32] = bytes
        .try_into()
        .map_err(|_| crate::error::WorkerError::invalid_argument("privkey must be 32 bytes"))?;
    Ok(KeyPair::from_bytes(&bytes))
}

pub use keypair_from_expert as reconstruct_keypair;
