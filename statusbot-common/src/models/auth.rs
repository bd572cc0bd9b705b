// File: statusbot-common/src/models/auth.rs

use std::collections::HashSet;

/// Sender identities allowed to issue commands.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorizedSenders {
    ids: HashSet<String>,
}

impl AuthorizedSenders {
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ids: ids
                .into_iter()
                .map(Into::into)
                .map(|id: String| id.trim().to_string())
                .filter(|id| !id.is_empty())
                .collect(),
        }
    }

    pub fn is_authorized(&self, sender_id: &str) -> bool {
        self.ids.contains(sender_id)
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn membership() {
        let senders = AuthorizedSenders::new(["137177294518091776", " 42 ", ""]);
        assert_eq!(senders.len(), 2);
        assert!(senders.is_authorized("137177294518091776"));
        assert!(senders.is_authorized("42"));
        assert!(!senders.is_authorized("43"));
    }

    #[test]
    fn empty_allows_nobody() {
        let senders = AuthorizedSenders::default();
        assert!(senders.is_empty());
        assert!(!senders.is_authorized(""));
    }
}
