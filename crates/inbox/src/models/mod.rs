//! Domain models for conversation and message entities

mod attachment;
mod conversation;
mod message;

pub use attachment::{LocalAttachment, PreviewHandle};
pub use conversation::{Conversation, ConversationId, ConversationStatus, Platform};
pub use message::{Direction, Message, MessageBody, MessageId};
