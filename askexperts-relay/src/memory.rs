//! In-process relay pool used by tests: an in-memory pub/sub bus standing
//! in for a real relay network, so session-engine and scheduler tests run
//! without network I/O.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use askexperts_types::SignedEvent;
use tokio::sync::{broadcast, mpsc, RwLock};

use crate::error::RelayResult;
use crate::filter::Filter;
use crate::pool::{PublishResult, RelayPool, Subscription};

const CHANNEL_CAPACITY: usize = 1024;

#[derive(Default)]
pub struct InMemoryRelayPool {
    relays: RwLock<HashMap<String, broadcast::Sender<SignedEvent>>>,
}

impl InMemoryRelayPool {
    pub fn new() -> Self {
        Self::default()
    }

    async fn sender_for(&self, relay: &str) -> broadcast::Sender<SignedEvent> {
        if let Some(tx) = self.relays.read().await.get(relay) {
            return tx.clone();
        }
        let mut relays = self.relays.write().await;
        relays
            .entry(relay.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .clone()
    }
}

#[async_trait]
impl RelayPool for InMemoryRelayPool {
    async fn publish(&self, event: SignedEvent, relays: &[String]) -> RelayResult<PublishResult> {
        let mut accepted = HashSet::new();
        for relay in relays {
            let tx = self.sender_for(relay).await;
            // A broadcast send only fails when there are no receivers; the
            // relay still "accepts" the event for any later subscriber.
            let _ = tx.send(event.clone());
            accepted.insert(relay.clone());
        }
        Ok(PublishResult { accepted })
    }

    async fn subscribe(&self, filter: Filter, relays: &[String]) -> RelayResult<Subscription> {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let seen = Arc::new(std::sync::Mutex::new(HashSet::<String>::new()));
        let mut tasks = Vec::new();

        for relay in relays {
            let mut relay_rx = self.sender_for(relay).await.subscribe();
            let tx = tx.clone();
            let filter = filter.clone();
            let seen = seen.clone();
            tasks.push(tokio::spawn(async move {
                loop {
                    match relay_rx.recv().await {
                        Ok(event) => {
                            if !filter.matches(&event) {
                                continue;
                            }
                            let fresh = seen.lock().unwrap().insert(event.id.clone());
                            if fresh && tx.send(event).await.is_err() {
                                break;
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(_)) => continue,
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            }));
        }

        Ok(Subscription::new(rx, tasks))
    }

    async fn close(&self) {
        self.relays.write().await.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use askexperts_types::EventKind;
    use std::time::Duration;

    fn event(id: &str, kind: EventKind) -> SignedEvent {
        SignedEvent {
            id: id.into(),
            pubkey: "pk".into(),
            created_at: 0,
            kind,
            tags: vec![],
            content: String::new(),
            sig: "sig".into(),
        }
    }

    #[tokio::test]
    async fn publish_then_subscribe_delivers_event() {
        let pool = InMemoryRelayPool::new();
        let relays = vec!["relay1".to_string()];
        let mut sub = pool
            .subscribe(Filter::by_kind(EventKind::Ask), &relays)
            .await
            .unwrap();

        pool.publish(event("a1", EventKind::Ask), &relays)
            .await
            .unwrap();

        let received = tokio::time::timeout(Duration::from_millis(200), sub.next())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(received.id, "a1");
    }

    #[tokio::test]
    async fn dedups_across_relays() {
        let pool = InMemoryRelayPool::new();
        let relays = vec!["relay1".to_string(), "relay2".to_string()];
        let mut sub = pool
            .subscribe(Filter::by_kind(EventKind::Ask), &relays)
            .await
            .unwrap();

        pool.publish(event("dup", EventKind::Ask), &relays)
            .await
            .unwrap();

        let first = tokio::time::timeout(Duration::from_millis(200), sub.next())
            .await
            .unwrap();
        assert!(first.is_some());

        let second = tokio::time::timeout(Duration::from_millis(100), sub.next()).await;
        assert!(second.is_err(), "duplicate from the second relay must be dropped");
    }
}
