//! Client-side timeouts and defaults. No env/CLI parsing here — binaries
//! that embed this engine layer that on top.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Relays the ask is published to and bids/quotes/replies are watched on
    /// until a bid's own relay set takes over.
    pub discovery_relays: Vec<String>,
    pub find_experts_deadline: Duration,
    pub quote_timeout: Duration,
    pub reply_timeout: Duration,
    /// Ceiling past which `ClientHooks::on_max_amount_exceeded` fires before
    /// `on_pay` is invoked. `None` disables the check.
    pub max_amount_sats: Option<u64>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            discovery_relays: Vec::new(),
            find_experts_deadline: Duration::from_secs(5),
            quote_timeout: Duration::from_secs(30),
            reply_timeout: Duration::from_secs(60),
            max_amount_sats: None,
        }
    }
}
