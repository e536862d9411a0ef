//! Conversation directory operations
//!
//! Coordinates read-state, archival and preview updates against the
//! storage backend. Status transitions are last-write-wins: the same
//! conversation may be opened from several views and each open marks it
//! read independently.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, info};

use crate::error::InboxError;
use crate::models::{Conversation, ConversationId, ConversationStatus};
use crate::storage::InboxStore;

/// Authoritative view over the conversation list
pub struct ConversationStore {
    store: Arc<dyn InboxStore>,
}

impl ConversationStore {
    /// Create a new conversation store over a storage backend
    pub fn new(store: Arc<dyn InboxStore>) -> Self {
        Self { store }
    }

    /// Resolve a conversation by id
    ///
    /// Fails with [`InboxError::NotFound`] when the id has no backing
    /// record; the error is surfaced to the caller, never retried.
    pub fn select(&self, id: &ConversationId) -> Result<Conversation, InboxError> {
        self.store
            .get_conversation(id)?
            .ok_or_else(|| InboxError::NotFound(id.clone()))
    }

    /// List conversations ordered by last activity, newest first
    pub fn list(&self, limit: usize, offset: usize) -> Result<Vec<Conversation>, InboxError> {
        Ok(self.store.list_conversations(limit, offset)?)
    }

    /// Mark a conversation as read
    ///
    /// Idempotent: calling twice has no additional effect. Also flips the
    /// read flag on the stored messages.
    pub fn mark_read(&self, id: &ConversationId) -> Result<(), InboxError> {
        let updated = self
            .store
            .set_conversation_status(id, ConversationStatus::Read)?;
        if !updated {
            return Err(InboxError::NotFound(id.clone()));
        }
        let changed = self.store.mark_messages_read(id)?;
        debug!("Marked {} read ({} messages changed)", id, changed);
        Ok(())
    }

    /// Record message activity on a conversation
    ///
    /// Refreshes the preview and activity timestamp. Inbound activity
    /// flips the conversation to unread; outbound does not.
    pub fn note_activity(
        &self,
        id: &ConversationId,
        preview: &str,
        at: DateTime<Utc>,
        inbound: bool,
    ) -> Result<(), InboxError> {
        let updated = self.store.update_conversation_preview(id, preview, at)?;
        if !updated {
            return Err(InboxError::NotFound(id.clone()));
        }
        if inbound {
            self.store
                .set_conversation_status(id, ConversationStatus::Unread)?;
        }
        Ok(())
    }

    /// Soft-archive a conversation
    ///
    /// Archived conversations drop out of the default listing but are
    /// never hard-deleted.
    pub fn archive(&self, id: &ConversationId) -> Result<(), InboxError> {
        if !self.store.set_conversation_archived(id, true)? {
            return Err(InboxError::NotFound(id.clone()));
        }
        info!("Archived conversation {}", id);
        Ok(())
    }

    /// Restore an archived conversation to the default listing
    pub fn unarchive(&self, id: &ConversationId) -> Result<(), InboxError> {
        if !self.store.set_conversation_archived(id, false)? {
            return Err(InboxError::NotFound(id.clone()));
        }
        info!("Unarchived conversation {}", id);
        Ok(())
    }

    /// Replace the team tags on a conversation
    pub fn set_tags(&self, id: &ConversationId, tags: Vec<String>) -> Result<(), InboxError> {
        if !self.store.set_conversation_tags(id, tags)? {
            return Err(InboxError::NotFound(id.clone()));
        }
        Ok(())
    }
}
