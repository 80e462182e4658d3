//! Session Engine — Expert: *idle → bid_offered? → quoting → awaiting_proof
//! → serving → idle* per incoming prompt, driven by reactive handlers over
//! the relay's `Ask`/`Prompt`/`Proof` events rather than an internal poll
//! loop — mirrors the client engine's "caller drives each step" shape.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use askexperts_adapters::openai::decode_prompt_content;
use askexperts_adapters::{ContextProvider, ReplyGenerator};
use askexperts_crypto::{compress, decompress, decrypt, decrypt_from, encrypt, sign_event, KeyPair, SessionKey};
use askexperts_payments::PaymentBackend;
use askexperts_relay::RelayPool;
use askexperts_types::{
    Ask, Bid, BidId, Compression, EventKind, Proof, PromptFormat, Quote, Reply, SignedEvent, UnsignedEvent,
};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::config::{ExpertConfig, ExpertProfile};
use crate::error::{ExpertError, ExpertResult};
use crate::hooks::ExpertHooks;
use crate::pricing::{estimate_tokens_in, price_sats};
use crate::session::{ExpertSession, SessionPhase};

fn now_ts() -> i64 {
    chrono::Utc::now().timestamp()
}

struct ExpertInner {
    keypair: KeyPair,
    profile: ExpertProfile,
    config: ExpertConfig,
    relay_pool: Arc<dyn RelayPool>,
    payment_backend: Arc<dyn PaymentBackend>,
    hooks: Arc<dyn ExpertHooks>,
    context_provider: Arc<dyn ContextProvider>,
    reply_generator: Arc<dyn ReplyGenerator>,
    sessions: RwLock<HashMap<BidId, ExpertSession>>,
    enabled: RwLock<bool>,
}

/// The Session Engine — Expert. Cheap to clone; every clone shares the
/// same identity, sessions, and backends.
#[derive(Clone)]
pub struct ExpertEngine(Arc<ExpertInner>);

impl ExpertEngine {
    pub fn new(
        keypair: KeyPair,
        mut profile: ExpertProfile,
        config: ExpertConfig,
        relay_pool: Arc<dyn RelayPool>,
        payment_backend: Arc<dyn PaymentBackend>,
        hooks: Arc<dyn ExpertHooks>,
        context_provider: Arc<dyn ContextProvider>,
        reply_generator: Arc<dyn ReplyGenerator>,
    ) -> Self {
        profile.pubkey = keypair.public_key_hex().to_string();
        Self(Arc::new(ExpertInner {
            keypair,
            profile,
            config,
            relay_pool,
            payment_backend,
            hooks,
            context_provider,
            reply_generator,
            sessions: RwLock::new(HashMap::new()),
            enabled: RwLock::new(true),
        }))
    }

    pub fn pubkey(&self) -> &str {
        &self.0.profile.pubkey
    }

    pub async fn set_enabled(&self, enabled: bool) {
        *self.0.enabled.write().await = enabled;
    }

    pub async fn is_enabled(&self) -> bool {
        *self.0.enabled.read().await
    }

    /// *idle* → **ask received** transition. Filters by enabled-ness and
    /// addressing, consults [`ExpertHooks::bid`], and publishes a signed
    /// bid on `source_relays` when offered. Returns the bid id, or `None`
    /// if the ask was declined or not addressed to this expert.
    pub async fn handle_ask(&self, ask_event: SignedEvent, source_relays: &[String]) -> ExpertResult<Option<BidId>> {
        if ask_event.kind != EventKind::Ask {
            return Ok(None);
        }
        if !self.is_enabled().await {
            return Ok(None);
        }

        let ask: Ask =
            serde_json::from_str(&ask_event.content).map_err(|e| ExpertError::internal(e.to_string()))?;
        let addressed = ask
            .hashtags
            .iter()
            .any(|t| self.0.profile.hashtags.contains(t))
            || ask.expert_pubkeys.iter().any(|p| p == self.pubkey());
        if !addressed {
            return Ok(None);
        }

        let Some(expert_bid) = self.0.hooks.bid(&ask).await else {
            return Ok(None);
        };

        let bid_body = Bid {
            bid_id: String::new(),
            expert_pubkey: self.pubkey().to_string(),
            offer: expert_bid.offer,
            bid_sats: expert_bid.bid_sats,
            relays: self.0.config.relays.clone(),
            expert_x25519_pub: hex::encode(self.0.keypair.x25519_public()),
            invoice: None,
            payment_hash: None,
        };
        let unsigned = UnsignedEvent {
            pubkey: self.pubkey().to_string(),
            created_at: now_ts(),
            kind: EventKind::Bid,
            tags: vec![vec!["e".to_string(), ask_event.id.clone()]],
            content: serde_json::to_string(&bid_body).map_err(|e| ExpertError::internal(e.to_string()))?,
        };
        let signed = sign_event(unsigned, &self.0.keypair);
        let bid_id = signed.id.clone();

        let publish = self.0.relay_pool.publish(signed, source_relays).await?;
        if !publish.any_accepted() {
            return Err(ExpertError::RelayPublishFailed);
        }

        let client_x25519_pub: [u8; 32] = hex::decode(&ask.client_x25519_pub)
            .map_err(|e| ExpertError::internal(e.to_string()))?
            .try_into()
            .map_err(|_| ExpertError::internal("client X25519 public key must be 32 bytes"))?;

        let session = ExpertSession::new(
            bid_id.clone(),
            ask_event.pubkey.clone(),
            client_x25519_pub,
            self.0.config.relays.clone(),
        );
        self.0.sessions.write().await.insert(bid_id.clone(), session);
        info!(bid_id = %bid_id, "offered bid");
        Ok(Some(bid_id))
    }

    /// *awaiting_prompt* → **prompt received** → *quoting* transition.
    /// Silently drops prompts not addressed to this expert or that don't
    /// match an open session's current context id (out-of-order events
    /// are dropped per the ordering guarantee).
    pub async fn handle_prompt(&self, prompt_event: SignedEvent) -> ExpertResult<()> {
        if prompt_event.tag("p") != Some(self.pubkey()) {
            return Ok(());
        }
        let prompt: askexperts_types::Prompt =
            serde_json::from_str(&prompt_event.content).map_err(|e| ExpertError::internal(e.to_string()))?;

        let bid_id = {
            let sessions = self.0.sessions.read().await;
            sessions
                .iter()
                .find(|(_, s)| matches!(s.phase, SessionPhase::AwaitingPrompt) && s.current_context_id == prompt.context_id)
                .map(|(id, _)| id.clone())
        };
        let Some(bid_id) = bid_id else {
            debug!(context_id = %prompt.context_id, "prompt matches no open session, dropping");
            return Ok(());
        };

        let (client_x25519_pub, relays, existing_key) = {
            let sessions = self.0.sessions.read().await;
            let session = sessions.get(&bid_id).expect("looked up above");
            (session.client_x25519_pub, session.relays.clone(), session.session_key.clone())
        };

        let session_key = match (&prompt.wrapped_session_key, existing_key) {
            (Some(wrapped), _) => {
                let bytes = decrypt_from(wrapped, &self.0.keypair, &client_x25519_pub).map_err(ExpertError::from)?;
                let bytes: [u8; 32] = bytes
                    .try_into()
                    .map_err(|_| ExpertError::internal("unwrapped session key must be 32 bytes"))?;
                SessionKey::from_bytes(bytes)
            }
            (None, Some(key)) => key,
            (None, None) => {
                warn!(bid_id = %bid_id, "prompt carries no wrapped session key and none is cached");
                return Ok(());
            }
        };

        let quote_result = self.build_quote(&prompt, &session_key).await;
        let (quote, invoice, plaintext) = match quote_result {
            Ok(built) => built,
            Err(e) => {
                self.publish_error_reply(&relays, prompt_event.id.clone(), e.error_code()).await?;
                self.0.sessions.write().await.remove(&bid_id);
                return Ok(());
            }
        };

        // Self-referencing id fields (`prompt_id`, `quote_id`) can't be
        // known before signing, since the event id is a hash of the
        // content that would carry them. Every party matches on the real
        // `SignedEvent::id`/`e` tags instead; these fields are local
        // bookkeeping only and are patched in after signing.
        let quote_tags = vec![vec!["e".to_string(), prompt_event.id.clone()]];
        let unsigned_quote = UnsignedEvent {
            pubkey: self.pubkey().to_string(),
            created_at: now_ts(),
            kind: EventKind::Quote,
            tags: quote_tags,
            content: serde_json::to_string(&quote).map_err(|e| ExpertError::internal(e.to_string()))?,
        };
        let signed_quote = sign_event(unsigned_quote, &self.0.keypair);
        let quote_id = signed_quote.id.clone();
        let publish = self.0.relay_pool.publish(signed_quote, &relays).await?;
        if !publish.any_accepted() {
            return Err(ExpertError::RelayPublishFailed);
        }

        let mut quote = quote;
        quote.quote_id = quote_id;
        quote.prompt_id = prompt_event.id.clone();

        let mut sessions = self.0.sessions.write().await;
        if let Some(session) = sessions.get_mut(&bid_id) {
            session.session_key = Some(session_key);
            session.phase = SessionPhase::AwaitingProof {
                quote,
                invoice,
                plaintext,
                quoted_at: now_ts(),
            };
        }
        Ok(())
    }

    /// Computes price and requests an invoice. Returns an error when
    /// retrieval context is required but absent; the caller turns that
    /// into an error quote rather than propagating it.
    async fn build_quote(
        &self,
        prompt: &askexperts_types::Prompt,
        session_key: &SessionKey,
    ) -> ExpertResult<(Quote, askexperts_types::Invoice, askexperts_types::PromptContent)> {
        let decrypted = decrypt(&prompt.content, session_key).map_err(ExpertError::from)?;
        let decompressed = decompress(&decrypted, prompt.compression).map_err(ExpertError::from)?;
        let content = decode_prompt_content(prompt.format.clone(), &decompressed).map_err(ExpertError::from)?;

        let prompt_text = match &content {
            askexperts_types::PromptContent::Text { text } => text.clone(),
            askexperts_types::PromptContent::Openai { messages } => {
                messages.last().map(|m| m.content.clone()).unwrap_or_default()
            }
        };
        let chunks = self
            .0
            .context_provider
            .context(&prompt_text)
            .await
            .map_err(ExpertError::from)?;
        if chunks.is_empty() && self.0.config.require_context {
            return Err(ExpertError::internal("no retrieval context available for this prompt"));
        }

        let tokens_in = estimate_tokens_in(&content);
        let amount_sats = price_sats(&self.0.profile, tokens_in, self.0.profile.default_expected_tokens_out);
        let invoice = self
            .0
            .payment_backend
            .make_invoice(amount_sats, "askexperts prompt", self.0.config.invoice_expiry_s)
            .await
            .map_err(ExpertError::from)?;

        let quote = Quote {
            quote_id: String::new(),
            prompt_id: prompt.prompt_id.clone(),
            invoices: vec![invoice.clone()],
            error: None,
        };
        Ok((quote, invoice, content))
    }

    /// *awaiting_proof* → **proof received** → (verify) → *serving* →
    /// *idle* transition. On verification failure, publishes a signed
    /// error reply and drops the session.
    pub async fn handle_proof(&self, proof_event: SignedEvent) -> ExpertResult<()> {
        let proof: Proof =
            serde_json::from_str(&proof_event.content).map_err(|e| ExpertError::internal(e.to_string()))?;

        let bid_id = {
            let sessions = self.0.sessions.read().await;
            sessions
                .iter()
                .find_map(|(id, s)| match &s.phase {
                    SessionPhase::AwaitingProof { quote, .. } if quote.quote_id == proof.quote_id => Some(id.clone()),
                    _ => None,
                })
        };
        let Some(bid_id) = bid_id else {
            debug!(quote_id = %proof.quote_id, "proof matches no open quote, dropping");
            return Ok(());
        };

        let (invoice, plaintext, relays, session_key) = {
            let sessions = self.0.sessions.read().await;
            let session = sessions.get(&bid_id).expect("looked up above");
            match &session.phase {
                SessionPhase::AwaitingProof { invoice, plaintext, .. } => (
                    invoice.clone(),
                    plaintext.clone(),
                    session.relays.clone(),
                    session.session_key.clone().expect("set when quote was built"),
                ),
                _ => unreachable!("matched only AwaitingProof sessions above"),
            }
        };

        if let Err(e) = askexperts_payments::verify(&invoice, &proof, self.0.payment_backend.as_ref()).await {
            let reason = askexperts_types::AskExpertsError::from(e).to_string();
            self.publish_error_reply(&relays, proof_event.id.clone(), &reason).await?;
            self.0.sessions.write().await.remove(&bid_id);
            return Ok(());
        }

        let context = self
            .0
            .context_provider
            .context(match &plaintext {
                askexperts_types::PromptContent::Text { text } => text,
                askexperts_types::PromptContent::Openai { messages } => {
                    messages.last().map(|m| m.content.as_str()).unwrap_or("")
                }
            })
            .await
            .map_err(ExpertError::from)?;

        let generation = self.0.reply_generator.generate(&plaintext, &context).await;
        let mut stream = match generation {
            Ok(stream) => stream,
            Err(e) => {
                let reason = askexperts_types::AskExpertsError::from(e).to_string();
                self.publish_error_reply(&relays, proof_event.id.clone(), &reason).await?;
                self.0.sessions.write().await.remove(&bid_id);
                return Ok(());
            }
        };

        use futures::StreamExt;
        let mut buffer = String::new();
        let mut last_reply_id: Option<String> = None;
        loop {
            let chunk = match stream.next().await {
                Some(Ok(chunk)) => chunk,
                Some(Err(e)) => {
                    let reason = askexperts_types::AskExpertsError::from(e).to_string();
                    self.publish_error_reply(&relays, proof_event.id.clone(), &reason).await?;
                    self.0.sessions.write().await.remove(&bid_id);
                    return Ok(());
                }
                None => break,
            };

            if self.0.profile.stream {
                let reply_id = self
                    .publish_reply(&relays, &proof_event.id, &chunk.text, chunk.done, &session_key)
                    .await?;
                last_reply_id = Some(reply_id);
                if chunk.done {
                    break;
                }
            } else {
                buffer.push_str(&chunk.text);
                if chunk.done {
                    let reply_id = self
                        .publish_reply(&relays, &proof_event.id, &buffer, true, &session_key)
                        .await?;
                    last_reply_id = Some(reply_id);
                    break;
                }
            }
        }

        if self.0.config.offer_followup {
            if let Some(reply_id) = last_reply_id {
                let mut sessions = self.0.sessions.write().await;
                if let Some(session) = sessions.get_mut(&bid_id) {
                    session.current_context_id = reply_id;
                    session.phase = SessionPhase::AwaitingPrompt;
                }
                return Ok(());
            }
        }
        self.0.sessions.write().await.remove(&bid_id);
        Ok(())
    }

    /// Publishes one reply chunk, encrypting with the session key and
    /// attaching a fresh follow-up invoice on the terminal chunk when the
    /// engine is configured to offer one. Returns the published reply's id.
    async fn publish_reply(
        &self,
        relays: &[String],
        proof_id: &str,
        text: &str,
        done: bool,
        session_key: &SessionKey,
    ) -> ExpertResult<String> {
        let compressed = compress(text.as_bytes(), Compression::Gzip).map_err(ExpertError::from)?;
        let encrypted = encrypt(&compressed, session_key).map_err(ExpertError::from)?;

        let followup_invoice = if done && self.0.config.offer_followup {
            let invoice = self
                .0
                .payment_backend
                .make_invoice(
                    price_sats(&self.0.profile, 0, self.0.profile.default_expected_tokens_out),
                    "askexperts follow-up",
                    self.0.config.invoice_expiry_s,
                )
                .await
                .map_err(ExpertError::from)?;
            Some(invoice.invoice)
        } else {
            None
        };

        let reply_body = Reply {
            reply_id: String::new(),
            proof_id: proof_id.to_string(),
            done,
            content: encrypted,
            followup_invoice,
            error: None,
        };
        let unsigned = UnsignedEvent {
            pubkey: self.pubkey().to_string(),
            created_at: now_ts(),
            kind: EventKind::Reply,
            tags: vec![vec!["e".to_string(), proof_id.to_string()]],
            content: serde_json::to_string(&reply_body).map_err(|e| ExpertError::internal(e.to_string()))?,
        };
        let signed = sign_event(unsigned, &self.0.keypair);
        let reply_id = signed.id.clone();
        let publish = self.0.relay_pool.publish(signed, relays).await?;
        if !publish.any_accepted() {
            return Err(ExpertError::RelayPublishFailed);
        }
        Ok(reply_id)
    }

    async fn publish_error_reply(&self, relays: &[String], keyed_to: String, reason: &str) -> ExpertResult<()> {
        let reply_body = Reply {
            reply_id: String::new(),
            proof_id: keyed_to.clone(),
            done: true,
            content: Vec::new(),
            followup_invoice: None,
            error: Some(reason.to_string()),
        };
        let unsigned = UnsignedEvent {
            pubkey: self.pubkey().to_string(),
            created_at: now_ts(),
            kind: EventKind::Reply,
            tags: vec![vec!["e".to_string(), keyed_to]],
            content: serde_json::to_string(&reply_body).map_err(|e| ExpertError::internal(e.to_string()))?,
        };
        let signed = sign_event(unsigned, &self.0.keypair);
        self.0.relay_pool.publish(signed, relays).await?;
        Ok(())
    }

    /// Drops sessions that have been waiting for a proof longer than
    /// `max_age`. The engine has no internal timer task; callers drive
    /// this on whatever cadence suits their deployment.
    pub async fn expire_stale_sessions(&self, max_age: Duration) {
        let cutoff = now_ts() - max_age.as_secs() as i64;
        let mut sessions = self.0.sessions.write().await;
        sessions.retain(|_, s| match &s.phase {
            SessionPhase::AwaitingProof { quoted_at, .. } => *quoted_at > cutoff,
            _ => true,
        });
    }

    #[cfg(test)]
    async fn session_count(&self) -> usize {
        self.0.sessions.read().await.len()
    }
}
