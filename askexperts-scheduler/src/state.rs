//! Authoritative state owned exclusively by the monitoring task (`monitor::run`).
//! Nothing outside that task ever touches these maps directly; connection
//! tasks only ever reach them through [`crate::command::Command`].

use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Instant;

use askexperts_types::{ExpertState, Pubkey};
use tokio::sync::mpsc;

use crate::protocol::SchedulerMessage;

/// `expert_state` entry: the scheduler's view of one expert's lifecycle.
#[derive(Debug, Clone)]
pub struct ExpertRuntime {
    pub state: ExpertState,
    pub worker_id: Option<String>,
    /// Mirrors `Expert::timestamp` at the last reconciliation, used to
    /// detect "record changed" while `starting`/`started`.
    pub timestamp: i64,
}

/// `workers` entry: one live (or recently-live) worker connection.
pub struct WorkerSlot {
    pub outbound: mpsc::UnboundedSender<SchedulerMessage>,
    pub active_experts: HashSet<Pubkey>,
    pub needs_job: bool,
    pub ready: bool,
    pub last_activity: Instant,
}

#[derive(Default)]
pub struct SchedulerState {
    pub expert_state: HashMap<Pubkey, ExpertRuntime>,
    pub queue: VecDeque<Pubkey>,
    pub workers: HashMap<String, WorkerSlot>,
    /// Connections that have sent at least one frame but whose worker_id
    /// hasn't bound a `WorkerSlot` yet are never stored separately: the
    /// first frame always carries `worker_id`, so binding happens inline.
    pub conn_to_worker: HashMap<u64, String>,
    /// Connections that have opened but not yet sent a frame identifying
    /// their `worker_id`.
    pub pending_conns: HashMap<u64, mpsc::UnboundedSender<SchedulerMessage>>,
    pub reconnect_deadlines: HashMap<String, Instant>,
    pub start_deadlines: HashMap<Pubkey, Instant>,
    pub last_poll_ts: i64,
}

impl SchedulerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueuing an already-queued expert is a no-op.
    pub fn enqueue(&mut self, pubkey: Pubkey) {
        if !self.queue.contains(&pubkey) {
            self.queue.push_back(pubkey);
        }
    }

    pub fn send_to_worker(&self, worker_id: &str, message: SchedulerMessage) {
        if let Some(slot) = self.workers.get(worker_id) {
            let _ = slot.outbound.send(message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enqueue_is_idempotent_and_preserves_fifo_order() {
        let mut state = SchedulerState::new();
        state.enqueue("expert-a".to_string());
        state.enqueue("expert-b".to_string());
        state.enqueue("expert-a".to_string());

        assert_eq!(state.queue.len(), 2);
        assert_eq!(state.queue.pop_front(), Some("expert-a".to_string()));
        assert_eq!(state.queue.pop_front(), Some("expert-b".to_string()));
        assert_eq!(state.queue.pop_front(), None);
    }
}
