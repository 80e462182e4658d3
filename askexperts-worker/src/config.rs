use std::time::Duration;

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// WebSocket URL of the scheduler's worker endpoint (e.g. `ws://host/ws/worker`).
    pub scheduler_url: String,
    /// Maximum number of ExpertInstances this worker hosts at once.
    pub capacity: usize,
    /// How often `need_job` is sent while under capacity.
    pub need_job_interval: Duration,
    /// Delay before retrying a dropped scheduler connection.
    pub reconnect_backoff: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            scheduler_url: "ws://127.0.0.1:8080/ws/worker".to_string(),
            capacity: 10,
            need_job_interval: Duration::from_secs(5),
            reconnect_backoff: Duration::from_secs(5),
        }
    }
}
