//! End-to-end: a seeded `Store` drives a real `Scheduler` over an axum
//! server; a `Worker` dials in over a real `tokio-tungstenite` client
//! connection and ends up hosting the seeded expert (S5-style: worker
//! lifecycle driven entirely by the wire protocol, no shortcuts).

use std::sync::Arc;
use std::time::Duration;

use askexperts_adapters::{AdapterResult, ContextChunk, NullContextProvider, ReplyChunk, ReplyGenerator, ReplyStream};
use askexperts_crypto::KeyPair;
use askexperts_expert::{AlwaysBidHooks, ExpertConfig, ExpertProfile};
use askexperts_relay::InMemoryRelayPool;
use askexperts_scheduler::{Scheduler, SchedulerConfig};
use askexperts_store::{InMemoryStore, Store};
use askexperts_types::{Expert, PromptContent, Wallet};
use askexperts_worker::{ExpertComponentFactory, ExpertComponents, InMemoryPaymentBackendFactory, WorkerConfig, WorkerResult};
use async_trait::async_trait;
use serde_json::json;

struct FixedReplyGenerator;

#[async_trait]
impl ReplyGenerator for FixedReplyGenerator {
    async fn generate(&self, _content: &PromptContent, _context: &[ContextChunk]) -> AdapterResult<ReplyStream> {
        Ok(Box::pin(futures::stream::once(async {
            Ok(ReplyChunk {
                text: "hi".into(),
                done: true,
            })
        })))
    }
}

struct TestComponentFactory {
    relays: Vec<String>,
}

#[async_trait]
impl ExpertComponentFactory for TestComponentFactory {
    async fn build(&self, expert: &Expert) -> WorkerResult<ExpertComponents> {
        let privkey = expert.privkey.clone().expect("seeded with a privkey");
        let bytes: [u8; 32] = hex::decode(privkey).unwrap().try_into().unwrap();
        Ok(ExpertComponents {
            keypair: KeyPair::from_bytes(&bytes),
            profile: ExpertProfile {
                hashtags: vec!["ai".into()],
                ..ExpertProfile::default()
            },
            config: ExpertConfig {
                relays: self.relays.clone(),
                ..ExpertConfig::default()
            },
            hooks: Arc::new(AlwaysBidHooks::new("hi")),
            context_provider: Arc::new(NullContextProvider),
            reply_generator: Arc::new(FixedReplyGenerator),
        })
    }
}

#[tokio::test]
async fn worker_connects_and_hosts_the_seeded_expert() {
    let store = Arc::new(InMemoryStore::new());
    store
        .seed_wallet(Wallet {
            id: 1,
            name: "main".into(),
            nwc: "nostr+walletconnect://wallet".into(),
            default: true,
        })
        .await;

    let expert_keypair = KeyPair::generate();
    let expert = Expert {
        pubkey: expert_keypair.public_key_hex().to_string(),
        nickname: "demo".into(),
        wallet_id: 1,
        expert_type: "rag".into(),
        env: json!({}),
        docstores: vec![],
        disabled: false,
        timestamp: 1,
        privkey: Some(hex::encode(expert_keypair.signing_key_bytes())),
    };
    store.put_expert(&expert).await.unwrap();

    let (scheduler, _monitor_handle) = Scheduler::new(
        store,
        SchedulerConfig {
            poll_interval: Duration::from_millis(20),
            ..SchedulerConfig::default()
        },
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = scheduler.router();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    let relay_pool = Arc::new(InMemoryRelayPool::new());
    let worker = askexperts_worker::Worker::new(
        "worker-1",
        WorkerConfig {
            scheduler_url: format!("ws://{addr}/ws/worker"),
            capacity: 1,
            need_job_interval: Duration::from_millis(20),
            reconnect_backoff: Duration::from_millis(100),
        },
        relay_pool,
        Arc::new(InMemoryPaymentBackendFactory),
        Arc::new(TestComponentFactory {
            relays: vec!["relay1".to_string()],
        }),
    );
    let worker_for_run = worker.clone();
    tokio::spawn(async move {
        worker_for_run.run().await;
    });

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        if worker.hosted_pubkeys().await.len() == 1 {
            break;
        }
        if tokio::time::Instant::now() >= deadline {
            panic!("worker never hosted the seeded expert");
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
