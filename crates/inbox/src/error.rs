//! Error taxonomy for the inbox core
//!
//! All boundary failures are converted to these values and surfaced to the
//! caller. Nothing is retried automatically: delivery adapters are not
//! guaranteed idempotent, so a human decides whether to resend.

use crate::models::ConversationId;

/// Errors surfaced by inbox operations
#[derive(Debug, thiserror::Error)]
pub enum InboxError {
    /// Referenced conversation has no backing record
    #[error("Conversation not found: {0}")]
    NotFound(ConversationId),

    /// Compose request with no text and no attachment
    #[error("Nothing to send: draft has no text and no attachment")]
    EmptyDraft,

    /// Attachment exceeds the upload cap; rejected before any upload attempt
    #[error("Attachment too large: {size_bytes} bytes (limit {limit_bytes})")]
    TooLarge { size_bytes: u64, limit_bytes: u64 },

    /// Attachment MIME type is not accepted at the storage boundary
    #[error("Unsupported media type: {0}")]
    UnsupportedMedia(String),

    /// Storage boundary failure; the send is aborted with no partial state
    #[error("Attachment upload failed: {0}")]
    UploadFailed(String),

    /// Delivery adapter reported failure; no message was recorded
    #[error("Delivery failed: {0}")]
    DeliveryFailed(String),

    /// Suggestion requested with no inbound message in the context window
    #[error("No inbound context for suggestion")]
    NoContext,

    /// History load failed; the caller may retry
    #[error("Failed to load messages: {0}")]
    Load(String),

    /// Transport failure on a boundary call
    #[error("Transport error: {0}")]
    Transport(String),

    /// Boundary call exceeded its deadline
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Local storage failure
    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<anyhow::Error> for InboxError {
    fn from(e: anyhow::Error) -> Self {
        InboxError::Storage(e.to_string())
    }
}
