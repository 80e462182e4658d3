//! The `RelayPool` contract: publish, subscribe, fetch over signed events.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use askexperts_types::SignedEvent;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::RelayResult;
use crate::filter::Filter;

/// Relays that acknowledged a publish.
#[derive(Debug, Clone, Default)]
pub struct PublishResult {
    pub accepted: HashSet<String>,
}

impl PublishResult {
    pub fn any_accepted(&self) -> bool {
        !self.accepted.is_empty()
    }
}

/// A live, deduplicated multiplex of events matching a filter across one
/// or more relays. Dropping or calling [`Subscription::close`] unwinds
/// every underlying socket task; both are safe to call more than once.
pub struct Subscription {
    receiver: mpsc::Receiver<SignedEvent>,
    tasks: Vec<JoinHandle<()>>,
}

impl Subscription {
    pub fn new(receiver: mpsc::Receiver<SignedEvent>, tasks: Vec<JoinHandle<()>>) -> Self {
        Self { receiver, tasks }
    }

    pub async fn next(&mut self) -> Option<SignedEvent> {
        self.receiver.recv().await
    }

    pub fn close(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
        self.receiver.close();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.close();
    }
}

/// Publish a signed event to N relays, subscribe to filters across M
/// relays (deduplicated by event id), and perform bounded-time fetches.
/// Ordering across relays is not guaranteed; implementations must survive
/// individual relay failures silently.
#[async_trait]
pub trait RelayPool: Send + Sync {
    async fn publish(&self, event: SignedEvent, relays: &[String]) -> RelayResult<PublishResult>;

    async fn subscribe(&self, filter: Filter, relays: &[String]) -> RelayResult<Subscription>;

    /// Bounded-time convenience over `subscribe`.
    async fn fetch(
        &self,
        filter: Filter,
        relays: &[String],
        deadline: Duration,
    ) -> RelayResult<Vec<SignedEvent>> {
        let mut sub = self.subscribe(filter, relays).await?;
        let mut out = Vec::new();
        let deadline_at = tokio::time::Instant::now() + deadline;
        loop {
            tokio::select! {
                _ = tokio::time::sleep_until(deadline_at) => break,
                event = sub.next() => match event {
                    Some(event) => out.push(event),
                    None => break,
                },
            }
        }
        sub.close();
        Ok(out)
    }

    /// Terminate all outstanding subscriptions without leaking sockets.
    async fn close(&self);
}
