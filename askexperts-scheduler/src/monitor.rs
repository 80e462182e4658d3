//! The single monitoring task: owns `SchedulerState` exclusively, driven by
//! the database-polling loop, armed timers, and commands from per-connection
//! transport tasks. Nothing else mutates scheduler state (§5's "owned by the
//! monitoring task, mutated via message passing" rule, taken literally).

use std::sync::Arc;
use std::time::Instant;

use askexperts_store::Store;
use askexperts_types::{Expert, ExpertState, Pubkey};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::command::Command;
use crate::config::SchedulerConfig;
use crate::protocol::{SchedulerMessage, WorkerMessage};
use crate::state::{ExpertRuntime, SchedulerState, WorkerSlot};

pub async fn run(store: Arc<dyn Store>, config: SchedulerConfig, mut commands: mpsc::UnboundedReceiver<Command>) {
    let mut state = SchedulerState::new();
    let mut poll_interval = tokio::time::interval(config.poll_interval);
    let mut timer_interval = tokio::time::interval(config.timer_resolution);

    loop {
        tokio::select! {
            cmd = commands.recv() => {
                match cmd {
                    Some(cmd) => handle_command(&mut state, &store, cmd).await,
                    None => break,
                }
            }
            _ = poll_interval.tick() => poll_store(&mut state, &store, &config).await,
            _ = timer_interval.tick() => check_timers(&mut state, &config),
        }
    }
}

async fn handle_command(state: &mut SchedulerState, store: &Arc<dyn Store>, cmd: Command) {
    match cmd {
        Command::ConnectionOpened { conn_id, outbound } => {
            state.pending_conns.insert(conn_id, outbound);
        }
        Command::Frame { conn_id, frame } => handle_frame(state, store, conn_id, frame).await,
        Command::ConnectionClosed { conn_id } => handle_disconnect(state, conn_id),
    }
}

async fn handle_frame(state: &mut SchedulerState, store: &Arc<dyn Store>, conn_id: u64, frame: WorkerMessage) {
    let worker_id = frame.worker_id().to_string();
    bind_connection(state, conn_id, &worker_id);

    match frame {
        WorkerMessage::Experts { experts, .. } => reconcile_worker_experts(state, &worker_id, experts),
        WorkerMessage::NeedJob { .. } => {
            if let Some(slot) = state.workers.get_mut(&worker_id) {
                slot.needs_job = true;
                slot.last_activity = Instant::now();
            }
            assign_job_to_worker(state, store, &worker_id).await;
        }
        WorkerMessage::Started { expert, .. } => {
            state.start_deadlines.remove(&expert);
            if let Some(rt) = state.expert_state.get_mut(&expert) {
                rt.state = ExpertState::Started;
            }
            info!(expert = %expert, worker = %worker_id, "expert started");
        }
        WorkerMessage::Stopped { expert, .. } => {
            state.expert_state.remove(&expert);
            if let Some(slot) = state.workers.get_mut(&worker_id) {
                slot.active_experts.remove(&expert);
            }
            info!(expert = %expert, worker = %worker_id, "expert stopped");
        }
    }
}

/// Binds a connection's pending outbound sender to `worker_id` on its first
/// frame, clearing any reconnect timer and restoring the slot.
fn bind_connection(state: &mut SchedulerState, conn_id: u64, worker_id: &str) {
    if state.conn_to_worker.get(&conn_id) == Some(&worker_id.to_string()) {
        return;
    }
    let Some(outbound) = state.pending_conns.remove(&conn_id) else {
        return;
    };
    state.conn_to_worker.insert(conn_id, worker_id.to_string());
    state.reconnect_deadlines.remove(worker_id);
    state.workers.insert(
        worker_id.to_string(),
        WorkerSlot {
            outbound,
            active_experts: Default::default(),
            needs_job: false,
            ready: false,
            last_activity: Instant::now(),
        },
    );
}

enum Reconciliation {
    Stop,
    BindStarted,
    Accept,
}

/// Reconciles a worker's reported hosted set against authoritative state,
/// then marks it `ready`.
fn reconcile_worker_experts(state: &mut SchedulerState, worker_id: &str, experts: Vec<Pubkey>) {
    for pubkey in experts {
        let decision = match state.expert_state.get(&pubkey) {
            None => Reconciliation::Stop,
            Some(rt) if rt.worker_id.is_some() && rt.worker_id.as_deref() != Some(worker_id) => {
                Reconciliation::Stop
            }
            Some(rt) => match rt.state {
                ExpertState::Queued => Reconciliation::BindStarted,
                ExpertState::Starting | ExpertState::Started => Reconciliation::Accept,
                ExpertState::Stopping | ExpertState::Stopped => Reconciliation::Stop,
            },
        };

        match decision {
            Reconciliation::Stop => {
                state.send_to_worker(worker_id, SchedulerMessage::Stop { expert: pubkey });
            }
            Reconciliation::BindStarted => {
                let timestamp = state.expert_state.get(&pubkey).map(|rt| rt.timestamp).unwrap_or(0);
                state.expert_state.insert(
                    pubkey.clone(),
                    ExpertRuntime {
                        state: ExpertState::Started,
                        worker_id: Some(worker_id.to_string()),
                        timestamp,
                    },
                );
                if let Some(slot) = state.workers.get_mut(worker_id) {
                    slot.active_experts.insert(pubkey);
                }
            }
            Reconciliation::Accept => {
                if let Some(slot) = state.workers.get_mut(worker_id) {
                    slot.active_experts.insert(pubkey);
                }
            }
        }
    }

    if let Some(slot) = state.workers.get_mut(worker_id) {
        slot.ready = true;
    }
}

async fn assign_job_to_worker(state: &mut SchedulerState, store: &Arc<dyn Store>, worker_id: &str) {
    let ready = state.workers.get(worker_id).map(|w| w.ready).unwrap_or(false);
    if !ready {
        return;
    }
    let Some(pubkey) = state.queue.pop_front() else {
        state.send_to_worker(worker_id, SchedulerMessage::NoJob {});
        return;
    };

    let expert = match store.get_expert(&pubkey).await {
        Ok(Some(expert)) if !expert.disabled => expert,
        Ok(_) => {
            debug!(expert = %pubkey, "queued expert vanished or disabled before assignment");
            return;
        }
        Err(err) => {
            warn!(expert = %pubkey, error = %err, "store lookup failed while assigning job");
            state.queue.push_front(pubkey);
            return;
        }
    };

    let nwc_string = match store.get_wallet(expert.wallet_id).await {
        Ok(Some(wallet)) => wallet.nwc,
        Ok(None) => {
            warn!(expert = %pubkey, wallet_id = expert.wallet_id, "wallet not found, dropping job");
            return;
        }
        Err(err) => {
            warn!(expert = %pubkey, error = %err, "wallet lookup failed while assigning job");
            state.queue.push_front(pubkey);
            return;
        }
    };

    state.send_to_worker(
        worker_id,
        SchedulerMessage::Job {
            expert_pubkey: expert.pubkey.clone(),
            expert_object: expert.clone(),
            nwc_string,
        },
    );

    state.start_deadlines.insert(expert.pubkey.clone(), Instant::now());
    state.expert_state.insert(
        expert.pubkey.clone(),
        ExpertRuntime {
            state: ExpertState::Starting,
            worker_id: Some(worker_id.to_string()),
            timestamp: expert.timestamp,
        },
    );
    if let Some(slot) = state.workers.get_mut(worker_id) {
        slot.needs_job = false;
        slot.active_experts.insert(expert.pubkey);
    }
}

fn handle_disconnect(state: &mut SchedulerState, conn_id: u64) {
    state.pending_conns.remove(&conn_id);
    let Some(worker_id) = state.conn_to_worker.remove(&conn_id) else {
        return;
    };
    state.workers.remove(&worker_id);
    state.reconnect_deadlines.insert(worker_id.clone(), Instant::now());
    warn!(worker = %worker_id, "worker disconnected, arming reconnect timer");
}

async fn poll_store(state: &mut SchedulerState, store: &Arc<dyn Store>, config: &SchedulerConfig) {
    let experts = match store.list_experts_after(state.last_poll_ts, config.poll_limit).await {
        Ok(experts) => experts,
        Err(err) => {
            warn!(error = %err, "store poll failed");
            return;
        }
    };
    for expert in experts {
        state.last_poll_ts = state.last_poll_ts.max(expert.timestamp);
        reconcile_from_store(state, store, &expert).await;
    }
}

async fn reconcile_from_store(state: &mut SchedulerState, store: &Arc<dyn Store>, expert: &Expert) {
    let existing = state.expert_state.get(&expert.pubkey).cloned();

    match existing {
        Some(rt) if expert.disabled && matches!(rt.state, ExpertState::Starting | ExpertState::Started) => {
            if let Some(worker_id) = &rt.worker_id {
                state.send_to_worker(
                    worker_id,
                    SchedulerMessage::Stop {
                        expert: expert.pubkey.clone(),
                    },
                );
            }
            state.expert_state.insert(
                expert.pubkey.clone(),
                ExpertRuntime {
                    state: ExpertState::Stopping,
                    worker_id: rt.worker_id,
                    timestamp: expert.timestamp,
                },
            );
        }
        None if !expert.disabled => state.enqueue(expert.pubkey.clone()),
        Some(rt)
            if !expert.disabled
                && matches!(rt.state, ExpertState::Starting | ExpertState::Started)
                && rt.timestamp != expert.timestamp =>
        {
            if let Some(worker_id) = &rt.worker_id {
                let nwc_string = store
                    .get_wallet(expert.wallet_id)
                    .await
                    .ok()
                    .flatten()
                    .map(|wallet| wallet.nwc)
                    .unwrap_or_default();
                state.send_to_worker(
                    worker_id,
                    SchedulerMessage::Restart {
                        expert: expert.pubkey.clone(),
                        expert_object: expert.clone(),
                        nwc_string,
                    },
                );
                state.start_deadlines.insert(expert.pubkey.clone(), Instant::now());
            }
            state.expert_state.insert(
                expert.pubkey.clone(),
                ExpertRuntime {
                    state: ExpertState::Starting,
                    worker_id: rt.worker_id,
                    timestamp: expert.timestamp,
                },
            );
        }
        Some(rt) if !expert.disabled && matches!(rt.state, ExpertState::Stopped | ExpertState::Stopping) => {
            state.enqueue(expert.pubkey.clone());
        }
        _ => {}
    }
}

fn check_timers(state: &mut SchedulerState, config: &SchedulerConfig) {
    let now = Instant::now();

    let expired_reconnects: Vec<String> = state
        .reconnect_deadlines
        .iter()
        .filter(|(_, deadline)| now.duration_since(**deadline) >= config.reconnect_timeout)
        .map(|(id, _)| id.clone())
        .collect();
    for worker_id in expired_reconnects {
        state.reconnect_deadlines.remove(&worker_id);
        let orphaned: Vec<Pubkey> = state
            .expert_state
            .iter()
            .filter(|(_, rt)| rt.worker_id.as_deref() == Some(worker_id.as_str()))
            .map(|(pubkey, _)| pubkey.clone())
            .collect();
        for pubkey in orphaned {
            state.expert_state.remove(&pubkey);
            state.enqueue(pubkey);
        }
        info!(worker = %worker_id, "reconnect timer expired, experts re-queued");
    }

    let expired_starts: Vec<Pubkey> = state
        .start_deadlines
        .iter()
        .filter(|(_, deadline)| now.duration_since(**deadline) >= config.start_timeout)
        .map(|(pubkey, _)| pubkey.clone())
        .collect();
    for pubkey in expired_starts {
        state.start_deadlines.remove(&pubkey);
        state.expert_state.remove(&pubkey);
        state.enqueue(pubkey.clone());
        warn!(expert = %pubkey, "start timeout, expert re-queued");
    }
}

