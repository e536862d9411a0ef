//! Conversation model representing a thread with one external participant

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier for a conversation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub String);

impl ConversationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ConversationId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ConversationId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Messaging platform a conversation lives on
///
/// Exactly one platform per conversation; the platform never changes after
/// the conversation is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Email,
    Whatsapp,
    Instagram,
    Facebook,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Email => "email",
            Platform::Whatsapp => "whatsapp",
            Platform::Instagram => "instagram",
            Platform::Facebook => "facebook",
        }
    }

    /// Parse a platform from its wire name
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "email" => Some(Platform::Email),
            "whatsapp" => Some(Platform::Whatsapp),
            "instagram" => Some(Platform::Instagram),
            "facebook" => Some(Platform::Facebook),
            _ => None,
        }
    }
}

/// Read state of a conversation
///
/// Two-state flag set by message activity: inbound activity flips it to
/// `Unread`, opening the conversation flips it to `Read`. Transitions are
/// last-write-wins and idempotent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationStatus {
    Unread,
    Read,
}

/// A conversation with one external participant on one platform
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    /// Conversation ID
    pub id: ConversationId,
    /// Display name of the external participant
    pub contact_name: String,
    /// Platform handle of the external participant (address, phone, username)
    pub contact_handle: String,
    /// Platform this conversation lives on
    pub platform: Platform,
    /// Preview text of the last message
    pub preview: String,
    /// Read state, driven by message activity
    pub status: ConversationStatus,
    /// Team tags assigned to this conversation (0..n)
    #[serde(default)]
    pub tags: Vec<String>,
    /// Soft-archival flag; conversations are never hard-deleted
    #[serde(default)]
    pub archived: bool,
    /// Timestamp of the most recent activity
    pub last_activity_at: DateTime<Utc>,
}

impl Conversation {
    /// Create a new conversation with the given properties
    pub fn new(
        id: ConversationId,
        contact_name: impl Into<String>,
        contact_handle: impl Into<String>,
        platform: Platform,
        last_activity_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            contact_name: contact_name.into(),
            contact_handle: contact_handle.into(),
            platform,
            preview: String::new(),
            status: ConversationStatus::Unread,
            tags: Vec::new(),
            archived: false,
            last_activity_at,
        }
    }

    pub fn with_preview(mut self, preview: impl Into<String>) -> Self {
        self.preview = preview.into();
        self
    }

    pub fn with_status(mut self, status: ConversationStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }
}
