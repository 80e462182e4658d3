//! Real relay transport over WebSocket. Wire framing follows the
//! publish/subscribe convention of signed-event relays: `["EVENT", event]`
//! to publish, `["REQ", sub_id, filter]` to subscribe, `["EVENT", sub_id,
//! event]` as the relay's push, `["EOSE", sub_id]` at end of stored events.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use askexperts_types::SignedEvent;
use futures::{SinkExt, StreamExt};
use tokio::sync::{mpsc, RwLock};
use tokio_tungstenite::tungstenite::Message;

use crate::error::{RelayError, RelayResult};
use crate::filter::Filter;
use crate::pool::{PublishResult, RelayPool, Subscription};

const CHANNEL_CAPACITY: usize = 1024;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Relay pool backed by real WebSocket connections, one socket per
/// (relay, subscription) pair. Connection failures for a single relay are
/// logged and otherwise ignored; only a publish that every relay refuses
/// is surfaced to the caller.
#[derive(Default)]
pub struct WsRelayPool {
    stats: Arc<RwLock<PoolStats>>,
}

#[derive(Default, Clone, Copy)]
struct PoolStats {
    accepted: u64,
    failed: u64,
}

/// Snapshot of publish outcomes across the pool's lifetime.
#[derive(Debug, Clone, Copy, Default)]
pub struct RelayPoolStats {
    pub accepted: u64,
    pub failed: u64,
}

impl WsRelayPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn stats(&self) -> RelayPoolStats {
        let s = *self.stats.read().await;
        RelayPoolStats {
            accepted: s.accepted,
            failed: s.failed,
        }
    }

    async fn record(&self, accepted: bool) {
        let mut s = self.stats.write().await;
        if accepted {
            s.accepted += 1;
        } else {
            s.failed += 1;
        }
    }
}

#[async_trait]
impl RelayPool for WsRelayPool {
    async fn publish(&self, event: SignedEvent, relays: &[String]) -> RelayResult<PublishResult> {
        let mut accepted = HashSet::new();
        let frame = serde_json::to_string(&serde_json::json!(["EVENT", event]))
            .map_err(|e| RelayError::Transport(e.to_string()))?;

        for relay in relays {
            match publish_one(relay, &frame).await {
                Ok(()) => {
                    accepted.insert(relay.clone());
                    self.record(true).await;
                }
                Err(err) => {
                    tracing::warn!(relay = %relay, error = %err, "relay publish failed");
                    self.record(false).await;
                }
            }
        }

        if accepted.is_empty() {
            return Err(RelayError::PublishFailed);
        }
        Ok(PublishResult { accepted })
    }

    async fn subscribe(&self, filter: Filter, relays: &[String]) -> RelayResult<Subscription> {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let seen = Arc::new(std::sync::Mutex::new(HashSet::<String>::new()));
        let sub_id = format!("sub-{}", hex::encode(rand::random::<[u8; 8]>()));
        let mut tasks = Vec::new();

        for relay in relays {
            let relay = relay.clone();
            let tx = tx.clone();
            let filter = filter.clone();
            let seen = seen.clone();
            let sub_id = sub_id.clone();
            tasks.push(tokio::spawn(async move {
                if let Err(err) = run_subscription(&relay, &sub_id, &filter, tx, seen).await {
                    tracing::warn!(relay = %relay, error = %err, "relay subscription ended");
                }
            }));
        }

        Ok(Subscription::new(rx, tasks))
    }

    async fn close(&self) {
        // Sockets are owned by per-subscription tasks and torn down when
        // their `Subscription` is dropped; nothing pool-wide to release.
    }
}

async fn publish_one(relay: &str, frame: &str) -> Result<(), String> {
    let (mut socket, _) = tokio::time::timeout(CONNECT_TIMEOUT, tokio_tungstenite::connect_async(relay))
        .await
        .map_err(|_| "connect timed out".to_string())?
        .map_err(|e| e.to_string())?;

    socket
        .send(Message::Text(frame.to_string()))
        .await
        .map_err(|e| e.to_string())?;
    let _ = socket.close(None).await;
    Ok(())
}

async fn run_subscription(
    relay: &str,
    sub_id: &str,
    filter: &Filter,
    tx: mpsc::Sender<SignedEvent>,
    seen: Arc<std::sync::Mutex<HashSet<String>>>,
) -> Result<(), String> {
    let (mut socket, _) = tokio_tungstenite::connect_async(relay)
        .await
        .map_err(|e| e.to_string())?;

    let req = serde_json::json!(["REQ", sub_id, wire_filter(filter)]);
    socket
        .send(Message::Text(req.to_string()))
        .await
        .map_err(|e| e.to_string())?;

    while let Some(msg) = socket.next().await {
        let msg = msg.map_err(|e| e.to_string())?;
        let Message::Text(text) = msg else { continue };
        let Ok(frame) = serde_json::from_str::<serde_json::Value>(&text) else {
            continue;
        };
        let Some(label) = frame.get(0).and_then(|v| v.as_str()) else {
            continue;
        };
        if label != "EVENT" {
            continue;
        }
        let Some(raw_event) = frame.get(2).or_else(|| frame.get(1)) else {
            continue;
        };
        let Ok(event) = serde_json::from_value::<SignedEvent>(raw_event.clone()) else {
            continue;
        };
        if !filter.matches(&event) {
            continue;
        }
        let fresh = seen.lock().unwrap().insert(event.id.clone());
        if fresh && tx.send(event).await.is_err() {
            break;
        }
    }
    Ok(())
}

fn wire_filter(filter: &Filter) -> serde_json::Value {
    serde_json::json!({
        "kinds": filter.kinds,
        "ids": filter.ids,
        "authors": filter.authors,
        "#e": filter.e_tags,
        "#p": filter.p_tags,
        "#t": filter.hashtags,
    })
}
