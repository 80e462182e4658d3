//! Subscription filters matched against incoming relay events.

use askexperts_types::{EventId, EventKind, Pubkey};

/// Matches the relay's filter semantics: every populated field narrows the
/// match (AND across fields, OR within a field's list).
#[derive(Debug, Clone, Default)]
pub struct Filter {
    pub kinds: Vec<EventKind>,
    pub ids: Vec<EventId>,
    pub authors: Vec<Pubkey>,
    /// Match against `tags["e"]` — the referenced ask/prompt/quote/proof id.
    pub e_tags: Vec<EventId>,
    /// Match against `tags["p"]` — the addressed expert pubkey.
    pub p_tags: Vec<Pubkey>,
    /// Match against `tags["t"]` — hashtags.
    pub hashtags: Vec<String>,
}

impl Filter {
    pub fn by_kind(kind: EventKind) -> Self {
        Self {
            kinds: vec![kind],
            ..Default::default()
        }
    }

    pub fn with_e_tag(mut self, id: impl Into<EventId>) -> Self {
        self.e_tags.push(id.into());
        self
    }

    pub fn with_p_tag(mut self, pubkey: impl Into<Pubkey>) -> Self {
        self.p_tags.push(pubkey.into());
        self
    }

    pub fn with_hashtags(mut self, tags: Vec<String>) -> Self {
        self.hashtags = tags;
        self
    }

    pub fn with_authors(mut self, authors: Vec<Pubkey>) -> Self {
        self.authors = authors;
        self
    }

    pub fn matches(&self, event: &askexperts_types::SignedEvent) -> bool {
        if !self.kinds.is_empty() && !self.kinds.contains(&event.kind) {
            return false;
        }
        if !self.ids.is_empty() && !self.ids.contains(&event.id) {
            return false;
        }
        if !self.authors.is_empty() && !self.authors.contains(&event.pubkey) {
            return false;
        }
        if !self.e_tags.is_empty()
            && !event.tags_named("e").any(|v| self.e_tags.iter().any(|e| e == v))
        {
            return false;
        }
        if !self.p_tags.is_empty()
            && !event.tags_named("p").any(|v| self.p_tags.iter().any(|p| p == v))
        {
            return false;
        }
        if !self.hashtags.is_empty()
            && !event.tags_named("t").any(|v| self.hashtags.iter().any(|t| t == v))
        {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use askexperts_types::SignedEvent;

    fn event(kind: EventKind, tags: Vec<Vec<String>>) -> SignedEvent {
        SignedEvent {
            id: "id1".into(),
            pubkey: "pk1".into(),
            created_at: 0,
            kind,
            tags,
            content: String::new(),
            sig: "sig".into(),
        }
    }

    #[test]
    fn filters_by_kind_and_e_tag() {
        let filter = Filter::by_kind(EventKind::Bid).with_e_tag("ask1");
        let matching = event(EventKind::Bid, vec![vec!["e".into(), "ask1".into()]]);
        let wrong_ask = event(EventKind::Bid, vec![vec!["e".into(), "ask2".into()]]);
        let wrong_kind = event(EventKind::Quote, vec![vec!["e".into(), "ask1".into()]]);

        assert!(filter.matches(&matching));
        assert!(!filter.matches(&wrong_ask));
        assert!(!filter.matches(&wrong_kind));
    }
}
