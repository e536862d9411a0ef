//! Inbox crate - Business logic for the unified messaging inbox
//!
//! This crate provides platform-independent inbox functionality including:
//! - Domain models (Conversation, Message, LocalAttachment)
//! - Storage trait abstractions
//! - Per-conversation ordered message history
//! - Realtime insert subscription handling
//! - At-most-once outbound dispatch with attachment upload
//! - Reply suggestion drafting
//!
//! This crate has zero UI dependencies.

pub mod assist;
pub mod config;
pub mod conversations;
pub mod dispatch;
pub mod error;
pub mod message_log;
pub mod models;
pub mod realtime;
pub mod remote;
pub mod service;
pub mod storage;
pub mod upload;

pub use assist::{CONTEXT_WINDOW, SuggestionAssistant, SuggestionRequest, SuggestionService};
pub use config::ServiceEndpoints;
pub use conversations::ConversationStore;
pub use dispatch::{
    DeliveryAdapter, DeliveryReceipt, Draft, OutboundDispatcher, OutboundPayload, SenderIdentity,
};
pub use error::InboxError;
pub use message_log::MessageLog;
pub use models::{
    Conversation, ConversationId, ConversationStatus, Direction, LocalAttachment, Message,
    MessageBody, MessageId, Platform, PreviewHandle,
};
pub use realtime::{
    RealtimeSubscriber, RealtimeTransport, SubscriberState, Subscription, SubscriptionId,
};
pub use remote::{DeliveryClient, StorageClient, SuggestClient};
pub use service::{InboxService, OpenConversation};
pub use storage::{InMemoryInboxStore, InboxStore, SqliteInboxStore};
pub use upload::{AttachmentStorage, AttachmentUploader, MAX_ATTACHMENT_BYTES};
