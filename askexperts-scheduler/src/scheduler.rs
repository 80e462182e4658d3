use std::sync::Arc;

use askexperts_store::Store;
use axum::routing::get;
use axum::Router;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::command::CommandSender;
use crate::config::SchedulerConfig;
use crate::monitor;
use crate::transport::ws_worker_handler;

/// Cheap-clone handle onto a running scheduler: the monitoring task is
/// spawned once in [`Scheduler::new`] and owns all authoritative state for
/// as long as the handle (or any clone) is alive.
#[derive(Clone)]
pub struct Scheduler {
    commands: CommandSender,
}

impl Scheduler {
    pub fn new(store: Arc<dyn Store>, config: SchedulerConfig) -> (Self, JoinHandle<()>) {
        let (commands, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(monitor::run(store, config, rx));
        (Self { commands }, handle)
    }

    /// The axum router workers connect to at `/ws/worker`.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/ws/worker", get(ws_worker_handler))
            .with_state(self.commands.clone())
    }

    #[cfg(test)]
    pub(crate) fn commands(&self) -> &CommandSender {
        &self.commands
    }
}
