//! One running expert: an `ExpertEngine` plus the relay-subscription tasks
//! that feed it. Per §5, this instance's tasks are the only code that
//! drives this expert's state — the worker never reaches into it beyond
//! spawn/stop.

use std::sync::Arc;

use askexperts_expert::ExpertEngine;
use askexperts_payments::PaymentBackend;
use askexperts_relay::{Filter, RelayPool};
use askexperts_types::EventKind;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::components::ExpertComponents;
use crate::error::WorkerResult;

pub struct ExpertInstance {
    engine: ExpertEngine,
    tasks: Vec<JoinHandle<()>>,
}

impl ExpertInstance {
    /// Spawns the ask/prompt/proof subscription loops against `relay_pool`
    /// using `components.config.relays` and starts serving immediately.
    pub async fn spawn(
        relay_pool: Arc<dyn RelayPool>,
        payment_backend: Arc<dyn PaymentBackend>,
        components: ExpertComponents,
    ) -> WorkerResult<Self> {
        let relays = components.config.relays.clone();
        let engine = ExpertEngine::new(
            components.keypair,
            components.profile,
            components.config,
            relay_pool.clone(),
            payment_backend,
            components.hooks,
            components.context_provider,
            components.reply_generator,
        );

        let tasks = vec![
            spawn_ask_loop(engine.clone(), relay_pool.clone(), relays.clone()),
            spawn_prompt_loop(engine.clone(), relay_pool.clone(), relays.clone()),
            spawn_proof_loop(engine.clone(), relay_pool, relays),
        ];

        Ok(Self { engine, tasks })
    }

    pub fn pubkey(&self) -> &str {
        self.engine.pubkey()
    }

    /// Aborts every subscription task. The underlying relay subscriptions
    /// close themselves on `Drop`.
    pub async fn stop(mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

fn spawn_ask_loop(engine: ExpertEngine, relay_pool: Arc<dyn RelayPool>, relays: Vec<String>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut sub = match relay_pool.subscribe(Filter::by_kind(EventKind::Ask), &relays).await {
            Ok(sub) => sub,
            Err(err) => {
                warn!(error = %err, expert = %engine.pubkey(), "ask subscription failed");
                return;
            }
        };
        while let Some(event) = sub.next().await {
            if let Err(err) = engine.handle_ask(event, &relays).await {
                warn!(error = %err, expert = %engine.pubkey(), "ask handling failed");
            }
        }
    })
}

fn spawn_prompt_loop(engine: ExpertEngine, relay_pool: Arc<dyn RelayPool>, relays: Vec<String>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let filter = Filter::by_kind(EventKind::Prompt).with_p_tag(engine.pubkey().to_string());
        let mut sub = match relay_pool.subscribe(filter, &relays).await {
            Ok(sub) => sub,
            Err(err) => {
                warn!(error = %err, expert = %engine.pubkey(), "prompt subscription failed");
                return;
            }
        };
        while let Some(event) = sub.next().await {
            if let Err(err) = engine.handle_prompt(event).await {
                warn!(error = %err, expert = %engine.pubkey(), "prompt handling failed");
            }
        }
    })
}

/// Proof events carry no `p` tag (only `e=quote_id`), so this subscribes
/// broadly; `ExpertEngine::handle_proof` no-ops when a proof matches no
/// session of this expert's, so a broad feed is safe.
fn spawn_proof_loop(engine: ExpertEngine, relay_pool: Arc<dyn RelayPool>, relays: Vec<String>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut sub = match relay_pool.subscribe(Filter::by_kind(EventKind::Proof), &relays).await {
            Ok(sub) => sub,
            Err(err) => {
                warn!(error = %err, expert = %engine.pubkey(), "proof subscription failed");
                return;
            }
        };
        while let Some(event) = sub.next().await {
            if let Err(err) = engine.handle_proof(event).await {
                warn!(error = %err, expert = %engine.pubkey(), "proof handling failed");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use askexperts_adapters::{NullContextProvider, ReplyChunk, ReplyGenerator, ReplyStream};
    use askexperts_crypto::{sign_event, KeyPair};
    use askexperts_expert::{AlwaysBidHooks, ExpertConfig, ExpertProfile};
    use askexperts_payments::InMemoryPaymentBackend;
    use askexperts_relay::InMemoryRelayPool;
    use askexperts_types::{Ask, EventKind as EK, UnsignedEvent};
    use std::time::Duration;

    struct FixedReplyGenerator;

    #[async_trait::async_trait]
    impl ReplyGenerator for FixedReplyGenerator {
        async fn generate(
            &self,
            _content: &askexperts_types::PromptContent,
            _context: &[askexperts_adapters::ContextChunk],
        ) -> askexperts_adapters::AdapterResult<ReplyStream> {
            Ok(Box::pin(futures::stream::once(async {
                Ok(ReplyChunk {
                    text: "hi".into(),
                    done: true,
                })
            })))
        }
    }

    fn components(keypair: KeyPair, relays: Vec<String>) -> ExpertComponents {
        ExpertComponents {
            keypair,
            profile: ExpertProfile {
                hashtags: vec!["ai".into()],
                ..ExpertProfile::default()
            },
            config: ExpertConfig {
                relays,
                ..ExpertConfig::default()
            },
            hooks: Arc::new(AlwaysBidHooks::new("hello")),
            context_provider: Arc::new(NullContextProvider),
            reply_generator: Arc::new(FixedReplyGenerator),
        }
    }

    #[tokio::test]
    async fn spawned_instance_bids_on_a_matching_ask() {
        let relay_pool: Arc<dyn RelayPool> = Arc::new(InMemoryRelayPool::new());
        let payment_backend: Arc<dyn PaymentBackend> = Arc::new(InMemoryPaymentBackend::new());
        let relays = vec!["relay1".to_string()];
        let keypair = KeyPair::generate();

        let instance = ExpertInstance::spawn(relay_pool.clone(), payment_backend, components(keypair, relays.clone()))
            .await
            .unwrap();

        let mut bid_sub = relay_pool.subscribe(Filter::by_kind(EventKind::Bid), &relays).await.unwrap();

        let client = KeyPair::generate();
        let ask_body = Ask {
            ask_id: String::new(),
            summary: "anonymized".into(),
            hashtags: vec!["ai".into()],
            expert_pubkeys: vec![],
            max_bid_sats: None,
            client_x25519_pub: hex::encode(client.x25519_public()),
        };
        let unsigned = UnsignedEvent {
            pubkey: client.public_key_hex().to_string(),
            created_at: 0,
            kind: EK::Ask,
            tags: vec![],
            content: serde_json::to_string(&ask_body).unwrap(),
        };
        relay_pool.publish(sign_event(unsigned, &client), &relays).await.unwrap();

        let bid = tokio::time::timeout(Duration::from_millis(200), bid_sub.next())
            .await
            .unwrap()
            .expect("bid published");
        assert_eq!(bid.kind, EventKind::Bid);

        instance.stop().await;
    }
}
