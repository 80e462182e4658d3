//! Structured per-ask outcome, returned to the caller regardless of success.

use serde::{Deserialize, Serialize};

use crate::event::Pubkey;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AskSummary {
    pub sent: u32,
    pub failed: u32,
    pub received: u32,
    pub timeout: u32,
    pub failed_payments: u32,
    pub results: Vec<ExpertResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpertResult {
    pub expert_pubkey: Pubkey,
    pub outcome: ExpertOutcome,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpertOutcome {
    Received { final_text: String },
    Failed { reason: String },
    Timeout,
    FailedPayment { reason: String },
}

impl AskSummary {
    /// Success of the whole operation is determined by presence of any
    /// `received` entry.
    pub fn succeeded(&self) -> bool {
        self.received > 0
    }

    pub fn record(&mut self, expert_pubkey: Pubkey, outcome: ExpertOutcome) {
        match &outcome {
            ExpertOutcome::Received { .. } => self.received += 1,
            ExpertOutcome::Failed { .. } => self.failed += 1,
            ExpertOutcome::Timeout => self.timeout += 1,
            ExpertOutcome::FailedPayment { .. } => self.failed_payments += 1,
        }
        self.results.push(ExpertResult {
            expert_pubkey,
            outcome,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn succeeds_with_any_received() {
        let mut s = AskSummary::default();
        s.record("e1".into(), ExpertOutcome::Timeout);
        assert!(!s.succeeded());
        s.record(
            "e2".into(),
            ExpertOutcome::Received {
                final_text: "hi".into(),
            },
        );
        assert!(s.succeeded());
        assert_eq!(s.timeout, 1);
        assert_eq!(s.received, 1);
    }
}
