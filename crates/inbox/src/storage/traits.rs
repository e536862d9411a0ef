//! Storage trait definitions

use crate::models::{Conversation, ConversationId, ConversationStatus, Message, MessageId};
use anyhow::Result;
use chrono::{DateTime, Utc};

/// Trait for inbox storage operations
///
/// This trait abstracts over different storage backends (in-memory,
/// database) and provides the CRUD operations needed for conversations
/// and messages.
///
/// Ordering contracts:
/// - conversations list by last activity descending, archived excluded
/// - messages list by sent timestamp ascending, ties by insertion order
pub trait InboxStore: Send + Sync {
    /// Insert or update a conversation
    fn upsert_conversation(&self, conversation: Conversation) -> Result<()>;

    /// Get a conversation by ID
    fn get_conversation(&self, id: &ConversationId) -> Result<Option<Conversation>>;

    /// Check if a conversation exists
    fn has_conversation(&self, id: &ConversationId) -> Result<bool>;

    /// List non-archived conversations, ordered by last activity descending
    fn list_conversations(&self, limit: usize, offset: usize) -> Result<Vec<Conversation>>;

    /// Set the read state of a conversation
    ///
    /// Returns false if the conversation does not exist. Setting the same
    /// state twice is a no-op.
    fn set_conversation_status(
        &self,
        id: &ConversationId,
        status: ConversationStatus,
    ) -> Result<bool>;

    /// Set the soft-archival flag of a conversation
    ///
    /// Returns false if the conversation does not exist.
    fn set_conversation_archived(&self, id: &ConversationId, archived: bool) -> Result<bool>;

    /// Replace the team tags of a conversation
    ///
    /// Returns false if the conversation does not exist.
    fn set_conversation_tags(&self, id: &ConversationId, tags: Vec<String>) -> Result<bool>;

    /// Refresh the last-message preview and activity timestamp
    ///
    /// Returns false if the conversation does not exist.
    fn update_conversation_preview(
        &self,
        id: &ConversationId,
        preview: &str,
        last_activity_at: DateTime<Utc>,
    ) -> Result<bool>;

    /// Insert or update a message
    ///
    /// Upserting an existing message id preserves its original insertion
    /// order.
    fn upsert_message(&self, message: Message) -> Result<()>;

    /// Get a message by ID
    fn get_message(&self, id: &MessageId) -> Result<Option<Message>>;

    /// Check if a message exists
    fn has_message(&self, id: &MessageId) -> Result<bool>;

    /// List messages for a conversation, ordered by sent timestamp
    /// ascending, ties broken by insertion order
    fn list_messages_for_conversation(&self, id: &ConversationId) -> Result<Vec<Message>>;

    /// Flip the read flag on every message in a conversation
    ///
    /// Returns the number of messages that changed state.
    fn mark_messages_read(&self, id: &ConversationId) -> Result<usize>;

    /// Count all conversations, archived included
    fn count_conversations(&self) -> Result<usize>;

    /// Count messages in a conversation
    fn count_messages_in_conversation(&self, id: &ConversationId) -> Result<usize>;

    /// Clear all data (for testing)
    fn clear(&self) -> Result<()>;
}
