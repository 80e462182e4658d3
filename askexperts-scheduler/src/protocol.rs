//! Scheduler↔Worker wire frames: `{type, data}` tagged JSON, mirroring the
//! `ClientMessage`/`ServerMessage` adjacently-tagged enums in `resonancex-ws`.

use askexperts_types::{Expert, Pubkey};
use serde::{Deserialize, Serialize};

/// Frames a worker sends to the scheduler.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum WorkerMessage {
    /// Sent on connect and whenever the worker's hosted set changes; the
    /// first frame on any connection, which is how the scheduler learns
    /// `worker_id`.
    Experts {
        #[serde(rename = "workerId")]
        worker_id: String,
        experts: Vec<Pubkey>,
    },
    NeedJob {
        #[serde(rename = "workerId")]
        worker_id: String,
    },
    Started {
        #[serde(rename = "workerId")]
        worker_id: String,
        expert: Pubkey,
    },
    Stopped {
        #[serde(rename = "workerId")]
        worker_id: String,
        expert: Pubkey,
    },
}

impl WorkerMessage {
    pub fn worker_id(&self) -> &str {
        match self {
            Self::Experts { worker_id, .. }
            | Self::NeedJob { worker_id }
            | Self::Started { worker_id, .. }
            | Self::Stopped { worker_id, .. } => worker_id,
        }
    }
}

/// Frames the scheduler sends to a worker.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum SchedulerMessage {
    Job {
        expert_pubkey: Pubkey,
        expert_object: Expert,
        nwc_string: String,
    },
    Stop {
        expert: Pubkey,
    },
    Restart {
        expert: Pubkey,
        expert_object: Expert,
        nwc_string: String,
    },
    NoJob {},
}
