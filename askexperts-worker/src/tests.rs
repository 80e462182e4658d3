use std::sync::Arc;

use askexperts_adapters::{AdapterResult, ContextChunk, NullContextProvider, ReplyChunk, ReplyGenerator, ReplyStream};
use askexperts_crypto::KeyPair;
use askexperts_expert::{AlwaysBidHooks, ExpertConfig, ExpertProfile};
use askexperts_relay::{InMemoryRelayPool, RelayPool};
use askexperts_scheduler::{SchedulerMessage, WorkerMessage};
use askexperts_types::{Expert, PromptContent};
use async_trait::async_trait;
use serde_json::json;
use tokio::sync::mpsc;

use crate::components::{ExpertComponentFactory, ExpertComponents};
use crate::config::WorkerConfig;
use crate::error::WorkerResult;
use crate::payments::InMemoryPaymentBackendFactory;
use crate::worker::Worker;

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

/// Builds components straight from an `Expert` record's `privkey`, the
/// way a real embedder would reconstruct identity for a hosted expert.
struct TestComponentFactory {
    relays: Vec<String>,
}

#[async_trait]
impl ExpertComponentFactory for TestComponentFactory {
    async fn build(&self, expert: &Expert) -> WorkerResult<ExpertComponents> {
        let keypair = crate::components::reconstruct_keypair(expert)?;
        Ok(ExpertComponents {
            keypair,
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

fn sample_expert(pubkey_hex: &str, privkey_hex: &str) -> Expert {
    Expert {
        pubkey: pubkey_hex.to_string(),
        nickname: "demo".into(),
        wallet_id: 1,
        expert_type: "rag".into(),
        env: json!({}),
        docstores: vec![],
        disabled: false,
        timestamp: 1,
        privkey: Some(privkey_hex.to_string()),
    }
}

fn test_worker(relays: Vec<String>) -> Worker {
    let relay_pool: Arc<dyn RelayPool> = Arc::new(InMemoryRelayPool::new());
    Worker::new(
        "w1",
        WorkerConfig {
            capacity: 2,
            ..WorkerConfig::default()
        },
        relay_pool,
        Arc::new(InMemoryPaymentBackendFactory),
        Arc::new(TestComponentFactory { relays }),
    )
}

#[tokio::test]
async fn job_starts_an_instance_and_acks_started() {
    let worker = test_worker(vec!["relay1".into()]);
    let keypair = KeyPair::generate();
    let expert = sample_expert(
        &keypair.public_key_hex().to_string(),
        &hex::encode(keypair.signing_key_bytes()),
    );

    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel();
    worker
        .handle_scheduler_frame(
            SchedulerMessage::Job {
                expert_pubkey: expert.pubkey.clone(),
                expert_object: expert.clone(),
                nwc_string: "nostr+walletconnect://wallet".into(),
            },
            &outbound_tx,
        )
        .await;

    let ack = outbound_rx.recv().await.unwrap();
    assert!(matches!(ack, WorkerMessage::Started { expert: e, .. } if e == expert.pubkey));
    assert_eq!(worker.instance_count().await, 1);
}

#[tokio::test]
async fn stop_tears_down_the_instance_and_acks_stopped() {
    let worker = test_worker(vec!["relay1".into()]);
    let keypair = KeyPair::generate();
    let expert = sample_expert(
        &keypair.public_key_hex().to_string(),
        &hex::encode(keypair.signing_key_bytes()),
    );

    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel();
    worker
        .handle_scheduler_frame(
            SchedulerMessage::Job {
                expert_pubkey: expert.pubkey.clone(),
                expert_object: expert.clone(),
                nwc_string: "nostr+walletconnect://wallet".into(),
            },
            &outbound_tx,
        )
        .await;
    outbound_rx.recv().await.unwrap();

    worker
        .handle_scheduler_frame(
            SchedulerMessage::Stop {
                expert: expert.pubkey.clone(),
            },
            &outbound_tx,
        )
        .await;
    let ack = outbound_rx.recv().await.unwrap();
    assert!(matches!(ack, WorkerMessage::Stopped { expert: e, .. } if e == expert.pubkey));
    assert_eq!(worker.instance_count().await, 0);
}

#[tokio::test]
async fn restart_stops_then_starts_with_the_new_record() {
    let worker = test_worker(vec!["relay1".into()]);
    let keypair = KeyPair::generate();
    let expert = sample_expert(
        &keypair.public_key_hex().to_string(),
        &hex::encode(keypair.signing_key_bytes()),
    );

    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel();
    worker
        .handle_scheduler_frame(
            SchedulerMessage::Job {
                expert_pubkey: expert.pubkey.clone(),
                expert_object: expert.clone(),
                nwc_string: "nostr+walletconnect://wallet".into(),
            },
            &outbound_tx,
        )
        .await;
    outbound_rx.recv().await.unwrap();

    let mut restarted = expert.clone();
    restarted.timestamp = 2;
    worker
        .handle_scheduler_frame(
            SchedulerMessage::Restart {
                expert: expert.pubkey.clone(),
                expert_object: restarted,
                nwc_string: "nostr+walletconnect://wallet".into(),
            },
            &outbound_tx,
        )
        .await;

    let stopped = outbound_rx.recv().await.unwrap();
    assert!(matches!(stopped, WorkerMessage::Stopped { .. }));
    let started = outbound_rx.recv().await.unwrap();
    assert!(matches!(started, WorkerMessage::Started { .. }));
    assert_eq!(worker.instance_count().await, 1);
}

#[tokio::test]
async fn no_job_is_a_no_op() {
    let worker = test_worker(vec!["relay1".into()]);
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel();
    worker.handle_scheduler_frame(SchedulerMessage::NoJob {}, &outbound_tx).await;
    drop(outbound_tx);
    assert!(outbound_rx.recv().await.is_none());
    assert_eq!(worker.instance_count().await, 0);
}
