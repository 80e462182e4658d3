use std::sync::Arc;
use std::time::Duration;

use askexperts_store::{InMemoryStore, Store};
use askexperts_types::{Expert, Wallet};
use serde_json::json;
use tokio::sync::mpsc;

use crate::command::Command;
use crate::config::SchedulerConfig;
use crate::monitor;
use crate::protocol::{SchedulerMessage, WorkerMessage};

fn sample_expert(pubkey: &str, wallet_id: i64, disabled: bool, timestamp: i64) -> Expert {
    Expert {
        pubkey: pubkey.into(),
        nickname: "demo".into(),
        wallet_id,
        expert_type: "rag".into(),
        env: json!({}),
        docstores: vec![],
        disabled,
        timestamp,
        privkey: None,
    }
}

fn test_config() -> SchedulerConfig {
    SchedulerConfig {
        poll_interval: Duration::from_millis(10),
        poll_limit: 1000,
        start_timeout: Duration::from_millis(200),
        reconnect_timeout: Duration::from_millis(200),
        timer_resolution: Duration::from_millis(10),
    }
}

#[tokio::test(start_paused = true)]
async fn enabled_expert_is_queued_and_assigned_on_need_job() {
    let store = Arc::new(InMemoryStore::new());
    store
        .seed_wallet(Wallet {
            id: 1,
            name: "main".into(),
            nwc: "nostr+walletconnect://wallet".into(),
            default: true,
        })
        .await;
    store.put_expert(&sample_expert("exp1", 1, false, 10)).await.unwrap();

    let (commands_tx, commands_rx) = mpsc::unbounded_channel();
    tokio::spawn(monitor::run(store.clone(), test_config(), commands_rx));

    // Let the poll loop pick up the newly-seeded expert before a worker asks for work.
    tokio::time::advance(Duration::from_millis(50)).await;

    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel();
    commands_tx
        .send(Command::ConnectionOpened {
            conn_id: 1,
            outbound: outbound_tx,
        })
        .unwrap();
    commands_tx
        .send(Command::Frame {
            conn_id: 1,
            frame: WorkerMessage::Experts {
                worker_id: "w1".into(),
                experts: vec![],
            },
        })
        .unwrap();
    commands_tx
        .send(Command::Frame {
            conn_id: 1,
            frame: WorkerMessage::NeedJob {
                worker_id: "w1".into(),
            },
        })
        .unwrap();

    let message = outbound_rx.recv().await.unwrap();
    match message {
        SchedulerMessage::Job {
            expert_pubkey,
            nwc_string,
            ..
        } => {
            assert_eq!(expert_pubkey, "exp1");
            assert_eq!(nwc_string, "nostr+walletconnect://wallet");
        }
        other => panic!("expected Job, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn disconnected_worker_experts_are_requeued_after_timeout() {
    let store = Arc::new(InMemoryStore::new());
    store
        .seed_wallet(Wallet {
            id: 1,
            name: "main".into(),
            nwc: "nostr+walletconnect://wallet".into(),
            default: true,
        })
        .await;
    store.put_expert(&sample_expert("exp1", 1, false, 5)).await.unwrap();

    let (commands_tx, commands_rx) = mpsc::unbounded_channel();
    tokio::spawn(monitor::run(store.clone(), test_config(), commands_rx));

    tokio::time::advance(Duration::from_millis(20)).await;

    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel();
    commands_tx
        .send(Command::ConnectionOpened {
            conn_id: 7,
            outbound: outbound_tx,
        })
        .unwrap();
    commands_tx
        .send(Command::Frame {
            conn_id: 7,
            frame: WorkerMessage::Experts {
                worker_id: "w7".into(),
                experts: vec![],
            },
        })
        .unwrap();
    commands_tx
        .send(Command::Frame {
            conn_id: 7,
            frame: WorkerMessage::NeedJob {
                worker_id: "w7".into(),
            },
        })
        .unwrap();

    let _job = outbound_rx.recv().await.unwrap();

    commands_tx.send(Command::ConnectionClosed { conn_id: 7 }).unwrap();
    tokio::time::advance(Duration::from_millis(300)).await;

    let (outbound_tx2, mut outbound_rx2) = mpsc::unbounded_channel();
    commands_tx
        .send(Command::ConnectionOpened {
            conn_id: 8,
            outbound: outbound_tx2,
        })
        .unwrap();
    commands_tx
        .send(Command::Frame {
            conn_id: 8,
            frame: WorkerMessage::Experts {
                worker_id: "w8".into(),
                experts: vec![],
            },
        })
        .unwrap();
    commands_tx
        .send(Command::Frame {
            conn_id: 8,
            frame: WorkerMessage::NeedJob {
                worker_id: "w8".into(),
            },
        })
        .unwrap();

    let message = outbound_rx2.recv().await.unwrap();
    assert!(matches!(message, SchedulerMessage::Job { expert_pubkey, .. } if expert_pubkey == "exp1"));
}

#[tokio::test(start_paused = true)]
async fn unknown_expert_reported_by_worker_is_told_to_stop() {
    let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
    let (commands_tx, commands_rx) = mpsc::unbounded_channel();
    tokio::spawn(monitor::run(store, test_config(), commands_rx));

    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel();
    commands_tx
        .send(Command::ConnectionOpened {
            conn_id: 1,
            outbound: outbound_tx,
        })
        .unwrap();
    commands_tx
        .send(Command::Frame {
            conn_id: 1,
            frame: WorkerMessage::Experts {
                worker_id: "w1".into(),
                experts: vec!["ghost".into()],
            },
        })
        .unwrap();

    let message = outbound_rx.recv().await.unwrap();
    assert!(matches!(message, SchedulerMessage::Stop { expert } if expert == "ghost"));
}
