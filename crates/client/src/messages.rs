//! Message store for the open chat session.
//!
//! A single source of truth for messages arriving from both the REST history
//! endpoint and the realtime channel. Messages are kept sorted by
//! `created_at` and de-duplicated by id.

use livechat_shared::ChatMessage;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct MessageLog {
    /// Sorted by created_at ascending.
    messages: Vec<ChatMessage>,
    /// Whether the session history has been fetched from the REST API.
    is_loaded: bool,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn is_loaded(&self) -> bool {
        self.is_loaded
    }

    /// Add a message, keeping sort order. Returns false if a message with the
    /// same id is already present.
    pub fn add_message(&mut self, msg: ChatMessage) -> bool {
        if self.messages.iter().any(|m| m.id == msg.id) {
            return false;
        }

        // Equal timestamps keep arrival order.
        let pos = self
            .messages
            .partition_point(|m| m.created_at <= msg.created_at);
        self.messages.insert(pos, msg);
        true
    }

    /// Merge a fetched history into the log and mark it loaded. Messages
    /// that arrived over the realtime channel before the fetch are kept.
    pub fn set_history(&mut self, history: Vec<ChatMessage>) {
        for msg in history {
            self.add_message(msg);
        }
        self.is_loaded = true;
    }

    pub fn clear(&mut self) {
        self.messages.clear();
        self.is_loaded = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use livechat_shared::Sender;

    fn msg(id: &str, secs: i64) -> ChatMessage {
        ChatMessage {
            id: id.to_string(),
            sender: Sender::Merchant,
            text: format!("message {id}"),
            created_at: Utc.timestamp_opt(secs, 0).unwrap(),
        }
    }

    #[test]
    fn keeps_messages_sorted_and_unique() {
        let mut log = MessageLog::new();
        assert!(log.add_message(msg("b", 20)));
        assert!(log.add_message(msg("a", 10)));
        assert!(log.add_message(msg("c", 20)));
        assert!(!log.add_message(msg("a", 99)));

        let ids: Vec<_> = log.messages().iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
    }

    #[test]
    fn history_merges_with_live_messages() {
        let mut log = MessageLog::new();
        log.add_message(msg("live", 30));
        log.set_history(vec![msg("old-2", 20), msg("old-1", 10), msg("live", 30)]);

        assert!(log.is_loaded());
        let ids: Vec<_> = log.messages().iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["old-1", "old-2", "live"]);
    }
}
