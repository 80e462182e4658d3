//! Pricing contract: `price(prompt) -> amount_sats`, deterministic at the
//! instant of quoting. Default policy:
//! `ceil(tokens_in*price_in + expected_tokens_out*price_out) * (1+margin)`.

use askexperts_types::PromptContent;

use crate::config::ExpertProfile;

/// Crude token-count heuristic: whitespace-split word count for `TEXT`,
/// roughly 4 bytes per token for a serialized `OPENAI` payload. Standing
/// in for a real tokenizer, which is a policy choice left to the embedder.
pub fn estimate_tokens_in(content: &PromptContent) -> u64 {
    match content {
        PromptContent::Text { text } => text.split_whitespace().count().max(1) as u64,
        PromptContent::Openai { messages } => {
            let chars: usize = messages.iter().map(|m| m.content.len()).sum();
            ((chars / 4).max(1)) as u64
        }
    }
}

/// `ceil(tokens_in*price_in + expected_tokens_out*price_out) * (1+margin)`,
/// converted from millisatoshis to satoshis.
pub fn price_sats(profile: &ExpertProfile, tokens_in: u64, expected_tokens_out: u64) -> u64 {
    let raw_msat = tokens_in as f64 * profile.price_in_msat_per_token as f64
        + expected_tokens_out as f64 * profile.price_out_msat_per_token as f64;
    let marked_up_msat = raw_msat * (1.0 + profile.margin);
    (marked_up_msat / 1000.0).ceil() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_token_estimate_counts_words() {
        let content = PromptContent::Text {
            text: "how many tokens is this".into(),
        };
        assert_eq!(estimate_tokens_in(&content), 5);
    }

    #[test]
    fn price_is_deterministic_and_applies_margin() {
        let profile = ExpertProfile {
            price_in_msat_per_token: 10,
            price_out_msat_per_token: 30,
            margin: 0.5,
            ..ExpertProfile::default()
        };
        let price = price_sats(&profile, 100, 200);
        // (100*10 + 200*30) * 1.5 = (1000 + 6000) * 1.5 = 10500 msat = 11 sat (ceil)
        assert_eq!(price, 11);
        assert_eq!(price_sats(&profile, 100, 200), price);
    }
}
