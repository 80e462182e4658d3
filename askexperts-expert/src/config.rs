//! Expert profile (public pricing/capability advert) and engine config.

use std::time::Duration;

use askexperts_types::Pubkey;

/// Public capability advert for an expert, published as `K_PROFILE` and
/// used locally to decide whether to bid and how to price a prompt.
#[derive(Debug, Clone)]
pub struct ExpertProfile {
    pub pubkey: Pubkey,
    pub nickname: String,
    pub hashtags: Vec<String>,
    /// Whether this expert streams replies (`stream=true`) or always emits
    /// a single terminal reply carrying the whole response.
    pub stream: bool,
    /// Price per input token, in millisatoshis.
    pub price_in_msat_per_token: u64,
    /// Price per output token, in millisatoshis.
    pub price_out_msat_per_token: u64,
    /// Markup applied on top of the raw token cost, e.g. `0.2` for 20%.
    pub margin: f64,
    /// Assumed output length used to price a prompt before generation has
    /// run; exact numbers are a policy choice per the pricing contract.
    pub default_expected_tokens_out: u64,
}

impl Default for ExpertProfile {
    fn default() -> Self {
        Self {
            pubkey: String::new(),
            nickname: String::new(),
            hashtags: Vec::new(),
            stream: false,
            price_in_msat_per_token: 10,
            price_out_msat_per_token: 30,
            margin: 0.2,
            default_expected_tokens_out: 256,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExpertConfig {
    /// Relays the expert publishes bids/quotes/replies on and listens for
    /// prompts/proofs on.
    pub relays: Vec<String>,
    /// How long a quote may wait for its matching proof before the session
    /// is dropped by [`crate::engine::ExpertEngine::expire_stale_sessions`].
    pub proof_timeout: Duration,
    pub invoice_expiry_s: u32,
    /// If true, a quote whose retrieval context came back empty carries
    /// `error` instead of an invoice.
    pub require_context: bool,
    /// If true, the terminal reply of a session offers a follow-up invoice
    /// so the client can continue the conversation without a fresh bid.
    pub offer_followup: bool,
}

impl Default for ExpertConfig {
    fn default() -> Self {
        Self {
            relays: Vec::new(),
            proof_timeout: Duration::from_secs(30),
            invoice_expiry_s: 3600,
            require_context: false,
            offer_followup: true,
        }
    }
}
