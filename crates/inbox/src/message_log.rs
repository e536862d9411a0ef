//! Per-conversation ordered message history
//!
//! The log is mutated from exactly two places: the owning view's `load`
//! and the realtime subscriber's forwarded inserts. Initial load replaces
//! the log wholesale; live appends insert without ever reordering the
//! already-rendered history.

use std::collections::HashSet;

use log::debug;

use crate::error::InboxError;
use crate::models::{ConversationId, Message, MessageId};
use crate::storage::InboxStore;

/// Ordered message history for one conversation
///
/// Ordering invariant: messages are sorted by sent timestamp ascending,
/// ties broken by arrival order. Appending a message id that is already
/// present is a no-op, which makes the log safe against redundant
/// realtime deliveries and the load/subscribe race.
pub struct MessageLog {
    conversation_id: ConversationId,
    entries: Vec<Entry>,
    ids: HashSet<MessageId>,
    next_seq: u64,
}

struct Entry {
    seq: u64,
    message: Message,
}

impl MessageLog {
    /// Create an empty log for a conversation
    pub fn new(conversation_id: ConversationId) -> Self {
        Self {
            conversation_id,
            entries: Vec::new(),
            ids: HashSet::new(),
            next_seq: 0,
        }
    }

    pub fn conversation_id(&self) -> &ConversationId {
        &self.conversation_id
    }

    /// Load the history from storage, replacing the log wholesale
    ///
    /// Fails with [`InboxError::Load`] on a storage failure; the caller
    /// may retry. The store returns messages already ordered, so loaded
    /// entries get fresh arrival sequence numbers in that order.
    pub fn load(&mut self, store: &dyn InboxStore) -> Result<(), InboxError> {
        let messages = store
            .list_messages_for_conversation(&self.conversation_id)
            .map_err(|e| InboxError::Load(e.to_string()))?;

        self.entries.clear();
        self.ids.clear();
        self.next_seq = 0;

        for message in messages {
            self.ids.insert(message.id.clone());
            self.entries.push(Entry {
                seq: self.next_seq,
                message,
            });
            self.next_seq += 1;
        }

        debug!(
            "Loaded {} messages for {}",
            self.entries.len(),
            self.conversation_id
        );
        Ok(())
    }

    /// Insert a message, maintaining the ordering invariant
    ///
    /// Returns true if the message was inserted, false if its id was
    /// already present (duplicate delivery; the log is left unchanged).
    pub fn append(&mut self, message: Message) -> bool {
        if self.ids.contains(&message.id) {
            debug!("Dropping duplicate message {}", message.id.as_str());
            return false;
        }

        // Insert after every entry with an equal or earlier sent
        // timestamp, so equal timestamps keep arrival order.
        let pos = self
            .entries
            .partition_point(|e| e.message.sent_at <= message.sent_at);

        self.ids.insert(message.id.clone());
        self.entries.insert(
            pos,
            Entry {
                seq: self.next_seq,
                message,
            },
        );
        self.next_seq += 1;
        true
    }

    /// Most recent message, for UI auto-scroll
    pub fn scroll_anchor(&self) -> Option<&Message> {
        self.entries.last().map(|e| &e.message)
    }

    /// Messages in display order
    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.entries.iter().map(|e| &e.message)
    }

    /// The last `n` messages in display order
    pub fn tail(&self, n: usize) -> impl Iterator<Item = &Message> {
        let start = self.entries.len().saturating_sub(n);
        self.entries[start..].iter().map(|e| &e.message)
    }

    pub fn contains(&self, id: &MessageId) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Flip the read flag on every message in the log
    ///
    /// The read flag is the only permitted mutation of a recorded message.
    pub fn mark_all_read(&mut self) {
        for entry in &mut self.entries {
            entry.message.read = true;
        }
    }

    #[cfg(test)]
    fn arrival_seqs(&self) -> Vec<u64> {
        self.entries.iter().map(|e| e.seq).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Direction;
    use crate::storage::InMemoryInboxStore;
    use chrono::{Duration, Utc};

    fn make_message(id: &str, age_minutes: i64) -> Message {
        let sent_at = Utc::now() - Duration::minutes(age_minutes);
        Message::builder(MessageId::new(id), ConversationId::new("c1"))
            .direction(Direction::Inbound)
            .text(format!("Body for {}", id))
            .sender("Ada", "ada@example.com")
            .sent_at(sent_at)
            .build()
    }

    #[test]
    fn test_out_of_order_append_sorts_by_sent_at() {
        let mut log = MessageLog::new(ConversationId::new("c1"));

        // Delivered newest-first
        log.append(make_message("m3", 1));
        log.append(make_message("m1", 30));
        log.append(make_message("m2", 10));

        let ids: Vec<&str> = log.messages().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["m1", "m2", "m3"]);
    }

    #[test]
    fn test_equal_timestamps_keep_arrival_order() {
        let mut log = MessageLog::new(ConversationId::new("c1"));
        let sent_at = Utc::now();

        for id in ["m1", "m2", "m3"] {
            let mut msg = make_message(id, 0);
            msg.sent_at = sent_at;
            log.append(msg);
        }

        let ids: Vec<&str> = log.messages().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["m1", "m2", "m3"]);
    }

    #[test]
    fn test_duplicate_append_is_noop() {
        let mut log = MessageLog::new(ConversationId::new("c1"));

        assert!(log.append(make_message("m1", 5)));
        assert!(log.append(make_message("m2", 1)));

        // Same id delivered again, even with a different timestamp
        assert!(!log.append(make_message("m1", 0)));

        assert_eq!(log.len(), 2);
        let ids: Vec<&str> = log.messages().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["m1", "m2"]);
    }

    #[test]
    fn test_load_replaces_wholesale() {
        let store = InMemoryInboxStore::new();
        store.upsert_message(make_message("m1", 20)).unwrap();
        store.upsert_message(make_message("m2", 10)).unwrap();

        let mut log = MessageLog::new(ConversationId::new("c1"));
        // A realtime insert races ahead of the initial load
        log.append(make_message("m9", 1));

        log.load(&store).unwrap();

        assert_eq!(log.len(), 2);
        assert!(!log.contains(&MessageId::new("m9")));
        assert_eq!(log.arrival_seqs(), vec![0, 1]);
    }

    #[test]
    fn test_loaded_history_then_duplicate_realtime_delivery() {
        let store = InMemoryInboxStore::new();
        let m1 = make_message("m1", 20);
        let m2 = make_message("m2", 10);
        store.upsert_message(m1.clone()).unwrap();
        store.upsert_message(m2).unwrap();

        let mut log = MessageLog::new(ConversationId::new("c1"));
        log.load(&store).unwrap();

        // The realtime channel redelivers m1
        assert!(!log.append(m1));

        assert_eq!(log.len(), 2);
        let ids: Vec<&str> = log.messages().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["m1", "m2"]);
    }

    #[test]
    fn test_scroll_anchor_is_latest() {
        let mut log = MessageLog::new(ConversationId::new("c1"));
        assert!(log.scroll_anchor().is_none());

        log.append(make_message("m1", 10));
        log.append(make_message("m2", 1));
        // Late delivery of an older message must not move the anchor
        log.append(make_message("m0", 60));

        assert_eq!(log.scroll_anchor().unwrap().id.as_str(), "m2");
    }

    #[test]
    fn test_tail_window() {
        let mut log = MessageLog::new(ConversationId::new("c1"));
        for (i, age) in (0..8).map(|i| (i, 80 - i * 10)) {
            log.append(make_message(&format!("m{}", i), age));
        }

        let tail: Vec<&str> = log.tail(5).map(|m| m.id.as_str()).collect();
        assert_eq!(tail, vec!["m3", "m4", "m5", "m6", "m7"]);

        // Window larger than the log yields everything
        assert_eq!(log.tail(100).count(), 8);
    }

    #[test]
    fn test_mark_all_read() {
        let mut log = MessageLog::new(ConversationId::new("c1"));
        log.append(make_message("m1", 5));
        log.append(make_message("m2", 1));

        log.mark_all_read();
        assert!(log.messages().all(|m| m.read));
    }
}
