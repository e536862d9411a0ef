//! In-memory storage implementation
//!
//! Used for testing and as the session-local cache in hosts that keep the
//! authoritative data behind the remote transport.

use anyhow::Result;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use super::InboxStore;
use crate::models::{Conversation, ConversationId, ConversationStatus, Message, MessageId};

/// In-memory implementation of InboxStore
///
/// Uses HashMaps protected by RwLocks for thread-safe access. Each stored
/// message carries an arrival sequence number so that listing can break
/// sent-timestamp ties by insertion order.
pub struct InMemoryInboxStore {
    conversations: RwLock<HashMap<String, Conversation>>,
    messages: RwLock<HashMap<String, (u64, Message)>>,
    conversation_messages: RwLock<HashMap<String, HashSet<String>>>,
    next_seq: AtomicU64,
}

impl InMemoryInboxStore {
    /// Create a new empty in-memory store
    pub fn new() -> Self {
        Self {
            conversations: RwLock::new(HashMap::new()),
            messages: RwLock::new(HashMap::new()),
            conversation_messages: RwLock::new(HashMap::new()),
            next_seq: AtomicU64::new(0),
        }
    }
}

impl Default for InMemoryInboxStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InboxStore for InMemoryInboxStore {
    fn upsert_conversation(&self, conversation: Conversation) -> Result<()> {
        let mut conversations = self.conversations.write().unwrap();
        conversations.insert(conversation.id.0.clone(), conversation);
        Ok(())
    }

    fn get_conversation(&self, id: &ConversationId) -> Result<Option<Conversation>> {
        let conversations = self.conversations.read().unwrap();
        Ok(conversations.get(&id.0).cloned())
    }

    fn has_conversation(&self, id: &ConversationId) -> Result<bool> {
        let conversations = self.conversations.read().unwrap();
        Ok(conversations.contains_key(&id.0))
    }

    fn list_conversations(&self, limit: usize, offset: usize) -> Result<Vec<Conversation>> {
        let conversations = self.conversations.read().unwrap();
        let mut list: Vec<_> = conversations
            .values()
            .filter(|c| !c.archived)
            .cloned()
            .collect();

        // Sort by last_activity_at descending
        list.sort_by(|a, b| b.last_activity_at.cmp(&a.last_activity_at));

        Ok(list.into_iter().skip(offset).take(limit).collect())
    }

    fn set_conversation_status(
        &self,
        id: &ConversationId,
        status: ConversationStatus,
    ) -> Result<bool> {
        let mut conversations = self.conversations.write().unwrap();
        match conversations.get_mut(&id.0) {
            Some(conversation) => {
                conversation.status = status;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn set_conversation_archived(&self, id: &ConversationId, archived: bool) -> Result<bool> {
        let mut conversations = self.conversations.write().unwrap();
        match conversations.get_mut(&id.0) {
            Some(conversation) => {
                conversation.archived = archived;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn set_conversation_tags(&self, id: &ConversationId, tags: Vec<String>) -> Result<bool> {
        let mut conversations = self.conversations.write().unwrap();
        match conversations.get_mut(&id.0) {
            Some(conversation) => {
                conversation.tags = tags;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn update_conversation_preview(
        &self,
        id: &ConversationId,
        preview: &str,
        last_activity_at: DateTime<Utc>,
    ) -> Result<bool> {
        let mut conversations = self.conversations.write().unwrap();
        match conversations.get_mut(&id.0) {
            Some(conversation) => {
                conversation.preview = preview.to_string();
                conversation.last_activity_at = last_activity_at;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn upsert_message(&self, message: Message) -> Result<()> {
        let conversation_id = message.conversation_id.0.clone();
        let msg_id = message.id.0.clone();

        let mut messages = self.messages.write().unwrap();

        // Keep the original arrival sequence when the id already exists so
        // insertion-order ties stay stable across redundant upserts.
        let seq = match messages.get(&msg_id) {
            Some((seq, _)) => *seq,
            None => self.next_seq.fetch_add(1, Ordering::SeqCst),
        };
        messages.insert(msg_id.clone(), (seq, message));
        drop(messages);

        let mut conversation_messages = self.conversation_messages.write().unwrap();
        conversation_messages
            .entry(conversation_id)
            .or_default()
            .insert(msg_id);

        Ok(())
    }

    fn get_message(&self, id: &MessageId) -> Result<Option<Message>> {
        let messages = self.messages.read().unwrap();
        Ok(messages.get(&id.0).map(|(_, m)| m.clone()))
    }

    fn has_message(&self, id: &MessageId) -> Result<bool> {
        let messages = self.messages.read().unwrap();
        Ok(messages.contains_key(&id.0))
    }

    fn list_messages_for_conversation(&self, id: &ConversationId) -> Result<Vec<Message>> {
        let conversation_messages = self.conversation_messages.read().unwrap();
        let messages = self.messages.read().unwrap();

        let mut result: Vec<(u64, Message)> = Vec::new();

        if let Some(msg_ids) = conversation_messages.get(&id.0) {
            for msg_id in msg_ids {
                if let Some((seq, msg)) = messages.get(msg_id) {
                    result.push((*seq, msg.clone()));
                }
            }
        }

        // Sort by sent_at ascending, ties by arrival sequence
        result.sort_by(|(seq_a, a), (seq_b, b)| {
            a.sent_at.cmp(&b.sent_at).then(seq_a.cmp(seq_b))
        });

        Ok(result.into_iter().map(|(_, m)| m).collect())
    }

    fn mark_messages_read(&self, id: &ConversationId) -> Result<usize> {
        let conversation_messages = self.conversation_messages.read().unwrap();
        let mut messages = self.messages.write().unwrap();

        let mut changed = 0;
        if let Some(msg_ids) = conversation_messages.get(&id.0) {
            for msg_id in msg_ids {
                if let Some((_, msg)) = messages.get_mut(msg_id) {
                    if !msg.read {
                        msg.read = true;
                        changed += 1;
                    }
                }
            }
        }

        Ok(changed)
    }

    fn count_conversations(&self) -> Result<usize> {
        let conversations = self.conversations.read().unwrap();
        Ok(conversations.len())
    }

    fn count_messages_in_conversation(&self, id: &ConversationId) -> Result<usize> {
        let conversation_messages = self.conversation_messages.read().unwrap();
        Ok(conversation_messages
            .get(&id.0)
            .map(|s| s.len())
            .unwrap_or(0))
    }

    fn clear(&self) -> Result<()> {
        self.conversations.write().unwrap().clear();
        self.messages.write().unwrap().clear();
        self.conversation_messages.write().unwrap().clear();
        Ok(())
    }
}
