//! Session Engine — Client: `find_experts` discovers bidding experts for an
//! anonymized ask; `ask_expert` drives one expert through the strictly
//! ordered prompt → quote → proof → reply sequence.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use askexperts_crypto::{compress, decompress, decrypt, encrypt, encrypt_to, sign_event, KeyPair, SessionKey};
use askexperts_payments::PaymentBackend;
use askexperts_relay::{Filter, RelayPool};
use askexperts_types::{
    AskExpertsError, AskId, AskSummary, Bid, Compression, EventKind, ExpertOutcome, Prompt,
    PromptContent, PromptFormat, Proof, Pubkey, Quote, Reply, UnsignedEvent,
};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::hooks::{ClientHooks, PaymentBackendHooks};
use crate::reply::{ClientReply, ReplyStream};
use crate::session::{AskSession, ExpertContext};

fn now_ts() -> i64 {
    chrono::Utc::now().timestamp()
}

struct ClientInner {
    relay_pool: Arc<dyn RelayPool>,
    hooks: Arc<dyn ClientHooks>,
    config: ClientConfig,
    sessions: RwLock<HashMap<AskId, AskSession>>,
}

/// The Session Engine — Client. Cheap to clone; every clone shares the same
/// relay pool, hook set, and in-flight sessions.
#[derive(Clone)]
pub struct Client(Arc<ClientInner>);

impl Client {
    pub fn new(relay_pool: Arc<dyn RelayPool>, hooks: Arc<dyn ClientHooks>, config: ClientConfig) -> Self {
        Self(Arc::new(ClientInner {
            relay_pool,
            hooks,
            config,
            sessions: RwLock::new(HashMap::new()),
        }))
    }

    /// Convenience constructor for the common case: accept every quote and
    /// pay via a `PaymentBackend`.
    pub fn with_payment_backend(
        relay_pool: Arc<dyn RelayPool>,
        backend: Arc<dyn PaymentBackend>,
        config: ClientConfig,
    ) -> Self {
        Self::new(relay_pool, Arc::new(PaymentBackendHooks::new(backend)), config)
    }

    /// Publishes an anonymized ask and collects bids until `deadline`
    /// (`ClientConfig::find_experts_deadline` if not given). At least one of
    /// `hashtags`/`expert_pubkeys` must be non-empty.
    pub async fn find_experts(
        &self,
        summary: impl Into<String>,
        hashtags: Vec<String>,
        expert_pubkeys: Vec<Pubkey>,
        max_bid_sats: Option<u64>,
        deadline: Option<Duration>,
    ) -> ClientResult<(AskId, Vec<Bid>)> {
        let summary = summary.into();
        if hashtags.is_empty() && expert_pubkeys.is_empty() {
            return Err(ClientError::invalid_argument(
                "find_experts requires at least one hashtag or expert_pubkey",
            ));
        }

        let keypair = KeyPair::generate();
        let session_key = SessionKey::generate();

        let mut tags: Vec<Vec<String>> = hashtags
            .iter()
            .map(|t| vec!["t".to_string(), t.clone()])
            .collect();
        tags.extend(expert_pubkeys.iter().map(|p| vec!["p".to_string(), p.clone()]));

        let ask_body = askexperts_types::Ask {
            ask_id: String::new(),
            summary,
            hashtags,
            expert_pubkeys,
            max_bid_sats,
            client_x25519_pub: hex::encode(keypair.x25519_public()),
        };
        let unsigned = UnsignedEvent {
            pubkey: keypair.public_key_hex().to_string(),
            created_at: now_ts(),
            kind: EventKind::Ask,
            tags,
            content: serde_json::to_string(&ask_body).map_err(|e| ClientError::internal(e.to_string()))?,
        };
        let signed = sign_event(unsigned, &keypair);
        let ask_id = signed.id.clone();
        debug!(ask_id = %ask_id, "publishing ask");

        let publish = self
            .0
            .relay_pool
            .publish(signed, &self.0.config.discovery_relays)
            .await?;
        if !publish.any_accepted() {
            return Err(ClientError::RelayPublishFailed);
        }

        let deadline = deadline.unwrap_or(self.0.config.find_experts_deadline);
        let filter = Filter::by_kind(EventKind::Bid).with_e_tag(ask_id.clone());
        let events = self
            .0
            .relay_pool
            .fetch(filter, &self.0.config.discovery_relays, deadline)
            .await?;

        let bids = dedup_and_filter_bids(events, max_bid_sats);
        info!(ask_id = %ask_id, bids = bids.len(), "find_experts collected bids");

        let mut session = AskSession::new(session_key, keypair, now_ts());
        for bid in &bids {
            session.contexts.insert(
                bid.expert_pubkey.clone(),
                ExpertContext {
                    expert_pubkey: bid.expert_pubkey.clone(),
                    relays: bid.relays.clone(),
                    context_id: bid.bid_id.clone(),
                    expert_x25519_pub: bid.expert_x25519_pub.clone(),
                    session_key_sent: false,
                    followup_invoice: bid.invoice.clone(),
                },
            );
        }
        self.0.sessions.write().await.insert(ask_id.clone(), session);

        Ok((ask_id, bids))
    }

    /// Drives one expert through prompt → quote → proof → reply. Steps 1-6
    /// run eagerly; the returned stream only covers step 7 (reply
    /// collection) and step 8 (follow-up context bookkeeping).
    pub async fn ask_expert(
        &self,
        ask_id: &str,
        expert_pubkey: &str,
        content: PromptContent,
        format: PromptFormat,
        compression: Compression,
    ) -> ClientResult<ReplyStream> {
        // Step 1
        let (session_key, keypair, relays, context_id, expert_x25519_pub, session_key_sent) = {
            let sessions = self.0.sessions.read().await;
            let session = sessions.get(ask_id).ok_or_else(|| ClientError::SessionNotFound {
                ask_id: ask_id.to_string(),
            })?;
            let ctx = session
                .contexts
                .get(expert_pubkey)
                .ok_or_else(|| ClientError::SessionNotFound {
                    ask_id: ask_id.to_string(),
                })?;
            (
                session.session_key.clone(),
                session.keypair.clone(),
                ctx.relays.clone(),
                ctx.context_id.clone(),
                ctx.expert_x25519_pub.clone(),
                ctx.session_key_sent,
            )
        };

        // Step 2: build the Prompt event. The session key is wrapped to the
        // expert's X25519 public key exactly once, on the first prompt.
        let plaintext = plaintext_bytes(&content).map_err(ClientError::internal)?;
        let compressed = compress(&plaintext, compression).map_err(ClientError::from)?;
        let encrypted = encrypt(&compressed, &session_key).map_err(ClientError::from)?;

        let wrapped_session_key = if session_key_sent {
            None
        } else {
            let expert_x25519_bytes: [u8; 32] = hex::decode(&expert_x25519_pub)
                .map_err(|e| ClientError::internal(e.to_string()))?
                .try_into()
                .map_err(|_| ClientError::internal("expert X25519 public key must be 32 bytes"))?;
            Some(
                encrypt_to(session_key.as_bytes(), &keypair, &expert_x25519_bytes)
                    .map_err(ClientError::from)?,
            )
        };

        let mut prompt_body = Prompt {
            prompt_id: String::new(),
            expert_pubkey: expert_pubkey.to_string(),
            format,
            compression,
            content: encrypted,
            context_id: context_id.clone(),
            wrapped_session_key,
        };
        let prompt_tags = vec![
            vec!["p".to_string(), expert_pubkey.to_string()],
            vec!["e".to_string(), context_id],
        ];
        let unsigned_prompt = UnsignedEvent {
            pubkey: keypair.public_key_hex().to_string(),
            created_at: now_ts(),
            kind: EventKind::Prompt,
            tags: prompt_tags,
            content: serde_json::to_string(&prompt_body).map_err(|e| ClientError::internal(e.to_string()))?,
        };
        let signed_prompt = sign_event(unsigned_prompt, &keypair);
        let prompt_id = signed_prompt.id.clone();
        prompt_body.prompt_id = prompt_id.clone();

        // Step 3: publish.
        let publish = self.0.relay_pool.publish(signed_prompt, &relays).await?;
        if !publish.any_accepted() {
            return Err(ClientError::RelayPublishFailed);
        }
        if !session_key_sent {
            let mut sessions = self.0.sessions.write().await;
            if let Some(session) = sessions.get_mut(ask_id) {
                if let Some(ctx) = session.contexts.get_mut(expert_pubkey) {
                    ctx.session_key_sent = true;
                }
            }
        }

        // Step 4: subscribe for the quote.
        let quote_filter = Filter::by_kind(EventKind::Quote).with_e_tag(prompt_id.clone());
        let mut quote_sub = self.0.relay_pool.subscribe(quote_filter, &relays).await?;
        let quote_timeout = self.0.config.quote_timeout;
        let quote_event = tokio::time::timeout(quote_timeout, quote_sub.next())
            .await
            .map_err(|_| ClientError::QuoteTimeout {
                elapsed_ms: quote_timeout.as_millis() as u64,
            })?
            .ok_or_else(|| ClientError::QuoteTimeout {
                elapsed_ms: quote_timeout.as_millis() as u64,
            })?;
        quote_sub.close();

        let mut quote: Quote =
            serde_json::from_str(&quote_event.content).map_err(|e| ClientError::internal(e.to_string()))?;
        // Same constraint as `bid_id`: the quote id is the event id, not
        // the (necessarily empty) self-reference inside its own content.
        quote.quote_id = quote_event.id.clone();
        if quote.is_error() {
            return Err(ClientError::QuoteRejected);
        }
        if !self.0.hooks.on_quote(&quote).await {
            return Err(ClientError::QuoteRejected);
        }
        if let Some(max) = self.0.config.max_amount_sats {
            let headline = quote.invoices.first().map(|inv| inv.amount).unwrap_or(0);
            if headline > max && !self.0.hooks.on_max_amount_exceeded(&quote, max).await {
                return Err(ClientError::QuoteRejected);
            }
        }

        // The quote's declared amount must match what the bolt-11 string
        // actually encodes before any money moves.
        for invoice in &quote.invoices {
            askexperts_payments::check_invoice_amount(invoice).map_err(ClientError::from)?;
        }

        // Step 5: pay.
        let mut proof = self.0.hooks.on_pay(&quote, &prompt_body).await?;

        // Step 6: build the Proof event, publish.
        let proof_tags = vec![vec!["e".to_string(), quote.quote_id.clone()]];
        let unsigned_proof = UnsignedEvent {
            pubkey: keypair.public_key_hex().to_string(),
            created_at: now_ts(),
            kind: EventKind::Proof,
            tags: proof_tags,
            content: serde_json::to_string(&proof).map_err(|e| ClientError::internal(e.to_string()))?,
        };
        let signed_proof = sign_event(unsigned_proof, &keypair);
        let proof_id = signed_proof.id.clone();
        proof.proof_id = proof_id.clone();

        let publish = self.0.relay_pool.publish(signed_proof, &relays).await?;
        if !publish.any_accepted() {
            return Err(ClientError::RelayPublishFailed);
        }

        // Step 7/8: subscribe for replies and build the lazy stream.
        let reply_filter = Filter::by_kind(EventKind::Reply).with_e_tag(proof_id);
        let reply_sub = self.0.relay_pool.subscribe(reply_filter, &relays).await?;
        let reply_timeout = self.0.config.reply_timeout;

        let client = self.clone();
        let ask_id = ask_id.to_string();
        let expert_pubkey = expert_pubkey.to_string();

        let stream = async_stream::stream! {
            let mut sub = reply_sub;
            loop {
                let next = tokio::time::timeout(reply_timeout, sub.next()).await;
                let event = match next {
                    Ok(Some(event)) => event,
                    Ok(None) => break,
                    Err(_) => {
                        yield Err(ClientError::ReplyTimeout {
                            elapsed_ms: reply_timeout.as_millis() as u64,
                        });
                        break;
                    }
                };

                let reply: Reply = match serde_json::from_str(&event.content) {
                    Ok(reply) => reply,
                    Err(_) => continue,
                };

                if let Some(invoice) = reply.followup_invoice.clone() {
                    let mut sessions = client.sessions().write().await;
                    if let Some(session) = sessions.get_mut(&ask_id) {
                        if let Some(ctx) = session.contexts.get_mut(&expert_pubkey) {
                            ctx.context_id = reply.reply_id.clone();
                            ctx.followup_invoice = Some(invoice);
                        }
                    }
                }

                if reply.is_error() {
                    yield Ok(ClientReply {
                        text: String::new(),
                        done: true,
                        error: reply.error.clone(),
                    });
                    break;
                }

                let decrypted = match decrypt(&reply.content, &session_key) {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        yield Err(AskExpertsError::from(e));
                        break;
                    }
                };
                let decompressed = match decompress(&decrypted, compression) {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        yield Err(AskExpertsError::from(e));
                        break;
                    }
                };
                let text = String::from_utf8_lossy(&decompressed).into_owned();
                let done = reply.done;
                yield Ok(ClientReply { text, done, error: None });
                if done {
                    break;
                }
            }
            sub.close();
        };

        Ok(Box::pin(stream))
    }

    /// Runs `find_experts` then `ask_expert` against every matched expert
    /// concurrently, collecting a structured per-ask summary regardless of
    /// individual failures.
    pub async fn ask(
        &self,
        summary: impl Into<String>,
        hashtags: Vec<String>,
        expert_pubkeys: Vec<Pubkey>,
        max_bid_sats: Option<u64>,
        prompt: PromptContent,
        format: PromptFormat,
        compression: Compression,
    ) -> ClientResult<AskSummary> {
        let (ask_id, bids) = self
            .find_experts(summary, hashtags, expert_pubkeys, max_bid_sats, None)
            .await?;

        let mut out = AskSummary::default();
        let mut tasks = Vec::new();
        for bid in bids {
            let client = self.clone();
            let ask_id = ask_id.clone();
            let prompt = prompt.clone();
            tasks.push(tokio::spawn(async move {
                let expert_pubkey = bid.expert_pubkey.clone();
                let outcome = client
                    .drive_single_expert(&ask_id, &expert_pubkey, prompt, format, compression)
                    .await;
                (expert_pubkey, outcome)
            }));
        }

        for task in tasks {
            match task.await {
                Ok((expert_pubkey, outcome)) => {
                    out.sent += 1;
                    out.record(expert_pubkey, outcome);
                }
                Err(e) => warn!(error = %e, "expert task panicked"),
            }
        }

        Ok(out)
    }

    async fn drive_single_expert(
        &self,
        ask_id: &str,
        expert_pubkey: &str,
        prompt: PromptContent,
        format: PromptFormat,
        compression: Compression,
    ) -> ExpertOutcome {
        use futures::StreamExt;

        let mut stream = match self.ask_expert(ask_id, expert_pubkey, prompt, format, compression).await {
            Ok(stream) => stream,
            Err(AskExpertsError::QuoteTimeout { .. }) => return ExpertOutcome::Timeout,
            Err(e @ AskExpertsError::PaymentFailed { .. }) | Err(e @ AskExpertsError::InsufficientBalance) => {
                return ExpertOutcome::FailedPayment {
                    reason: e.to_string(),
                }
            }
            Err(e) => {
                return ExpertOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        };

        let mut final_text = String::new();
        while let Some(chunk) = stream.next().await {
            match chunk {
                Ok(reply) => {
                    if let Some(error) = reply.error {
                        return ExpertOutcome::FailedPayment { reason: error };
                    }
                    final_text = reply.text;
                    if reply.done {
                        return ExpertOutcome::Received { final_text };
                    }
                }
                Err(AskExpertsError::ReplyTimeout { .. }) => return ExpertOutcome::Timeout,
                Err(e) => {
                    return ExpertOutcome::Failed {
                        reason: e.to_string(),
                    }
                }
            }
        }
        ExpertOutcome::Received { final_text }
    }

    fn sessions(&self) -> &RwLock<HashMap<AskId, AskSession>> {
        &self.0.sessions
    }

    /// Idempotent: marks the session disposed and drops its contexts; any
    /// open `Subscription`s close on their own when dropped.
    pub async fn dispose(&self, ask_id: &str) {
        let mut sessions = self.0.sessions.write().await;
        if let Some(session) = sessions.get_mut(ask_id) {
            session.dispose();
        }
        sessions.remove(ask_id);
    }
}

/// First bid per expert wins; bids above `max_bid_sats` (when present on
/// both sides) are dropped.
fn dedup_and_filter_bids(events: Vec<askexperts_types::SignedEvent>, max_bid_sats: Option<u64>) -> Vec<Bid> {
    let mut seen = HashSet::new();
    let mut bids = Vec::new();
    for event in events {
        let mut bid: Bid = match serde_json::from_str(&event.content) {
            Ok(bid) => bid,
            Err(_) => continue,
        };
        // `bid_id` can't be signed into its own content, so every bid is
        // published with it empty; the real bid id is the event id.
        bid.bid_id = event.id.clone();
        if !seen.insert(bid.expert_pubkey.clone()) {
            continue;
        }
        if let (Some(max), Some(sats)) = (max_bid_sats, bid.bid_sats) {
            if sats > max {
                continue;
            }
        }
        bids.push(bid);
    }
    bids
}

fn plaintext_bytes(content: &PromptContent) -> Result<Vec<u8>, String> {
    match content {
        PromptContent::Text { text } => Ok(text.clone().into_bytes()),
        PromptContent::Openai { .. } => serde_json::to_vec(content).map_err(|e| e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use askexperts_relay::InMemoryRelayPool;
    use askexperts_types::{EventKind, SignedEvent};

    fn test_client() -> Client {
        let relay_pool: Arc<dyn RelayPool> = Arc::new(InMemoryRelayPool::new());
        let hooks: Arc<dyn ClientHooks> = Arc::new(NeverAskedHooks);
        let mut config = ClientConfig::default();
        config.discovery_relays = vec!["relay1".to_string()];
        Client::new(relay_pool, hooks, config)
    }

    struct NeverAskedHooks;

    #[async_trait::async_trait]
    impl ClientHooks for NeverAskedHooks {
        async fn on_quote(&self, _quote: &Quote) -> bool {
            panic!("no quote expected in this test")
        }

        async fn on_pay(&self, _quote: &Quote, _prompt: &Prompt) -> ClientResult<Proof> {
            panic!("no payment expected in this test")
        }
    }

    fn bid_event(ask_id: &str, expert_pubkey: &str, bid_sats: Option<u64>) -> SignedEvent {
        let bid = Bid {
            bid_id: format!("bid-{expert_pubkey}"),
            expert_pubkey: expert_pubkey.to_string(),
            offer: "I can help".to_string(),
            bid_sats,
            relays: vec!["relay1".to_string()],
            expert_x25519_pub: hex::encode(KeyPair::generate().x25519_public()),
            invoice: None,
            payment_hash: None,
        };
        SignedEvent {
            id: format!("bidevent-{expert_pubkey}"),
            pubkey: expert_pubkey.to_string(),
            created_at: 0,
            kind: EventKind::Bid,
            tags: vec![vec!["e".to_string(), ask_id.to_string()]],
            content: serde_json::to_string(&bid).unwrap(),
            sig: "sig".to_string(),
        }
    }

    #[tokio::test]
    async fn find_experts_requires_hashtags_or_pubkeys() {
        let client = test_client();
        let result = client
            .find_experts("anonymized", vec![], vec![], None, Some(Duration::from_millis(10)))
            .await;
        assert!(matches!(result, Err(AskExpertsError::InvalidArgument { .. })));
    }

    #[test]
    fn dedup_and_filter_bids_applies_max_bid_and_first_wins() {
        let events = vec![
            bid_event("ask1", "expert-cheap", Some(4)),
            bid_event("ask1", "expert-pricey", Some(7)),
            bid_event("ask1", "expert-cheap", Some(1)), // duplicate, ignored
        ];

        let bids = dedup_and_filter_bids(events, Some(5));
        assert_eq!(bids.len(), 1);
        assert_eq!(bids[0].expert_pubkey, "expert-cheap");
        assert_eq!(bids[0].bid_sats, Some(4));
    }

    #[tokio::test]
    async fn find_experts_publishes_ask_and_returns_empty_bids_when_none_arrive() {
        let client = test_client();
        let (ask_id, bids) = client
            .find_experts(
                "anonymized",
                vec!["ai".to_string()],
                vec![],
                None,
                Some(Duration::from_millis(20)),
            )
            .await
            .unwrap();
        assert!(!ask_id.is_empty());
        assert!(bids.is_empty());
    }

    #[tokio::test]
    async fn ask_expert_errors_on_unknown_session() {
        let client = test_client();
        let result = client
            .ask_expert(
                "missing-ask",
                "expert1",
                PromptContent::Text { text: "hi".to_string() },
                PromptFormat::Text,
                Compression::None,
            )
            .await;
        assert!(matches!(result, Err(AskExpertsError::SessionNotFound { .. })));
    }
}
