//! Message model representing a single message within a conversation

use super::ConversationId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier for a message (assigned by the delivery platform)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl MessageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for MessageId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for MessageId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Direction of a message relative to the workspace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Inbound,
    Outbound,
}

/// Message content, validated at the transport boundary
///
/// The transport delivers loosely shaped records; they are converted into
/// this tagged union before entering the core, so downstream code never
/// probes for maybe-missing fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum MessageBody {
    /// Plain text message
    Text { text: String },
    /// Media message with a durable URL and an optional caption
    Media {
        url: String,
        media_type: String,
        #[serde(default)]
        caption: Option<String>,
    },
    /// Platform-generated notice (joined, left, delivery notice)
    System { text: String },
}

impl MessageBody {
    pub fn text(text: impl Into<String>) -> Self {
        MessageBody::Text { text: text.into() }
    }

    /// Text content usable as a conversation preview
    pub fn preview(&self) -> &str {
        match self {
            MessageBody::Text { text } => text,
            MessageBody::Media { caption, .. } => caption.as_deref().unwrap_or("[media]"),
            MessageBody::System { text } => text,
        }
    }
}

/// A single message within a conversation
///
/// Immutable after creation except for the read flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Message ID
    pub id: MessageId,
    /// ID of the conversation this message belongs to
    pub conversation_id: ConversationId,
    /// Inbound from the participant or outbound from the workspace
    pub direction: Direction,
    /// Message content
    pub body: MessageBody,
    /// Display name of the sender
    pub sender_name: String,
    /// Platform handle of the sender
    pub sender_handle: String,
    /// When the platform recorded the message as sent
    pub sent_at: DateTime<Utc>,
    /// When this record was created locally
    pub created_at: DateTime<Utc>,
    /// Whether the message has been read
    #[serde(default)]
    pub read: bool,
}

impl Message {
    /// Create a new message builder
    pub fn builder(id: MessageId, conversation_id: ConversationId) -> MessageBuilder {
        MessageBuilder::new(id, conversation_id)
    }
}

/// Builder for creating Message instances
pub struct MessageBuilder {
    id: MessageId,
    conversation_id: ConversationId,
    direction: Direction,
    body: MessageBody,
    sender_name: String,
    sender_handle: String,
    sent_at: Option<DateTime<Utc>>,
    created_at: Option<DateTime<Utc>>,
    read: bool,
}

impl MessageBuilder {
    fn new(id: MessageId, conversation_id: ConversationId) -> Self {
        Self {
            id,
            conversation_id,
            direction: Direction::Inbound,
            body: MessageBody::text(""),
            sender_name: String::new(),
            sender_handle: String::new(),
            sent_at: None,
            created_at: None,
            read: false,
        }
    }

    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn body(mut self, body: MessageBody) -> Self {
        self.body = body;
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.body = MessageBody::text(text);
        self
    }

    pub fn sender(mut self, name: impl Into<String>, handle: impl Into<String>) -> Self {
        self.sender_name = name.into();
        self.sender_handle = handle.into();
        self
    }

    pub fn sent_at(mut self, sent_at: DateTime<Utc>) -> Self {
        self.sent_at = Some(sent_at);
        self
    }

    pub fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    pub fn read(mut self, read: bool) -> Self {
        self.read = read;
        self
    }

    pub fn build(self) -> Message {
        let created_at = self.created_at.unwrap_or_else(Utc::now);
        Message {
            id: self.id,
            conversation_id: self.conversation_id,
            direction: self.direction,
            body: self.body,
            sender_name: self.sender_name,
            sender_handle: self.sender_handle,
            sent_at: self.sent_at.unwrap_or(created_at),
            created_at,
            read: self.read,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let msg = Message::builder(MessageId::new("m1"), ConversationId::new("c1"))
            .text("hello")
            .build();

        assert_eq!(msg.direction, Direction::Inbound);
        assert_eq!(msg.body, MessageBody::text("hello"));
        assert!(!msg.read);
        assert_eq!(msg.sent_at, msg.created_at);
    }

    #[test]
    fn test_media_preview_uses_caption() {
        let with_caption = MessageBody::Media {
            url: "https://cdn.example.com/a.png".to_string(),
            media_type: "image/png".to_string(),
            caption: Some("invoice scan".to_string()),
        };
        assert_eq!(with_caption.preview(), "invoice scan");

        let without_caption = MessageBody::Media {
            url: "https://cdn.example.com/a.png".to_string(),
            media_type: "image/png".to_string(),
            caption: None,
        };
        assert_eq!(without_caption.preview(), "[media]");
    }

    #[test]
    fn test_body_serde_tagged() {
        let body = MessageBody::text("hi");
        let json = serde_json::to_string(&body).unwrap();
        assert!(json.contains(r#""kind":"text""#));

        let parsed: MessageBody = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, body);
    }
}
