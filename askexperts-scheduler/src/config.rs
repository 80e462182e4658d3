use std::time::Duration;

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// How often `store.list_experts_after` is polled.
    pub poll_interval: Duration,
    /// Page size passed to `list_experts_after`.
    pub poll_limit: u32,
    /// How long a `starting` expert may go without a `started` ack before
    /// it is re-queued.
    pub start_timeout: Duration,
    /// How long a disconnected worker's experts stay pinned to it before
    /// being re-queued.
    pub reconnect_timeout: Duration,
    /// Resolution at which armed timers are checked.
    pub timer_resolution: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            poll_limit: 1000,
            start_timeout: Duration::from_secs(60),
            reconnect_timeout: Duration::from_secs(60),
            timer_resolution: Duration::from_millis(500),
        }
    }
}
