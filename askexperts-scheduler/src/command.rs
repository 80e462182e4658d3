//! Commands the per-connection transport tasks hand to the monitoring task.
//! This is the only path by which a connection task influences scheduler
//! state — it never touches `SchedulerState` itself.

use tokio::sync::mpsc;

use crate::protocol::{SchedulerMessage, WorkerMessage};

pub enum Command {
    /// A new worker socket accepted; `conn_id` is a transport-local handle,
    /// not yet a `worker_id` (that arrives with the first frame).
    ConnectionOpened {
        conn_id: u64,
        outbound: mpsc::UnboundedSender<SchedulerMessage>,
    },
    Frame {
        conn_id: u64,
        frame: WorkerMessage,
    },
    ConnectionClosed {
        conn_id: u64,
    },
}

pub type CommandSender = mpsc::UnboundedSender<Command>;
