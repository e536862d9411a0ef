//! Outbound message dispatch
//!
//! Coordinates attachment upload, platform delivery and local recording
//! for a compose request. The guarantee is at-most-once with no silent
//! loss: a message is either fully delivered and recorded, or not
//! recorded at all. Nothing here retries; failures are surfaced so the
//! user can decide whether to resend with the draft still intact.

use std::sync::Arc;

use chrono::Utc;
use log::{info, warn};

use crate::conversations::ConversationStore;
use crate::error::InboxError;
use crate::message_log::MessageLog;
use crate::models::{
    Conversation, ConversationId, Direction, LocalAttachment, Message, MessageBody, MessageId,
    Platform,
};
use crate::storage::InboxStore;
use crate::upload::AttachmentUploader;

/// A compose request: text and/or one attachment
///
/// The draft is borrowed by `send`, never consumed, so on failure the
/// caller still holds it and can retry without retyping. Callers must
/// disable repeat submission while a send is in flight to avoid
/// duplicate dispatches from a double-click.
pub struct Draft {
    pub text: String,
    pub attachment: Option<LocalAttachment>,
}

impl Draft {
    pub fn text_only(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            attachment: None,
        }
    }

    pub fn with_attachment(text: impl Into<String>, attachment: LocalAttachment) -> Self {
        Self {
            text: text.into(),
            attachment: Some(attachment),
        }
    }

    /// True when there is nothing to send
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty() && self.attachment.is_none()
    }
}

/// Composed payload handed to the delivery adapter
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundPayload {
    pub conversation_id: ConversationId,
    pub platform: Platform,
    pub text: Option<String>,
    pub media_url: Option<String>,
    pub media_type: Option<String>,
}

/// Acknowledgement from the delivery platform
#[derive(Debug, Clone)]
pub struct DeliveryReceipt {
    /// Message id assigned by the platform
    pub message_id: String,
}

/// Platform-specific delivery boundary
///
/// Implementations perform the actual outbound transmission (email,
/// WhatsApp, social APIs) behind a generic send-message call. Adapters
/// are not assumed idempotent, which is why nothing upstream retries.
pub trait DeliveryAdapter: Send + Sync {
    fn deliver(&self, payload: &OutboundPayload) -> Result<DeliveryReceipt, InboxError>;
}

/// Sender identity stamped onto recorded outbound messages
#[derive(Debug, Clone)]
pub struct SenderIdentity {
    pub name: String,
    pub handle: String,
}

/// Dispatches compose requests to the delivery platform
pub struct OutboundDispatcher {
    store: Arc<dyn InboxStore>,
    delivery: Arc<dyn DeliveryAdapter>,
    uploader: AttachmentUploader,
    sender: SenderIdentity,
}

impl OutboundDispatcher {
    pub fn new(
        store: Arc<dyn InboxStore>,
        delivery: Arc<dyn DeliveryAdapter>,
        uploader: AttachmentUploader,
        sender: SenderIdentity,
    ) -> Self {
        Self {
            store,
            delivery,
            uploader,
            sender,
        }
    }

    /// Send a draft into the log's conversation
    ///
    /// Steps, in order:
    /// 1. validate the draft locally (EmptyDraft before any network call)
    /// 2. resolve the conversation (NotFound)
    /// 3. upload the attachment if present; failure aborts the send and
    ///    the delivery adapter is never invoked
    /// 4. hand the payload to the delivery adapter
    /// 5. on success, record the outbound message and refresh the
    ///    conversation preview; on failure, record nothing
    pub fn send(&self, log: &mut MessageLog, draft: &Draft) -> Result<Message, InboxError> {
        if draft.is_empty() {
            return Err(InboxError::EmptyDraft);
        }

        let conversation_id = log.conversation_id().clone();
        let conversation = self
            .store
            .get_conversation(&conversation_id)?
            .ok_or_else(|| InboxError::NotFound(conversation_id.clone()))?;

        let media = match &draft.attachment {
            Some(attachment) => {
                let url = self.uploader.upload(attachment)?;
                Some((url, attachment.mime_type.clone()))
            }
            None => None,
        };

        let trimmed = draft.text.trim();
        let payload = OutboundPayload {
            conversation_id: conversation_id.clone(),
            platform: conversation.platform,
            text: (!trimmed.is_empty()).then(|| trimmed.to_string()),
            media_url: media.as_ref().map(|(url, _)| url.clone()),
            media_type: media.as_ref().map(|(_, mime)| mime.clone()),
        };

        let receipt = match self.delivery.deliver(&payload) {
            Ok(receipt) => receipt,
            Err(e) => {
                warn!("Delivery to {} failed: {}", conversation_id, e);
                return Err(e);
            }
        };

        let message = self.record(&conversation, &payload, &receipt)?;
        log.append(message.clone());

        info!(
            "Dispatched {} to {} via {}",
            message.id.as_str(),
            conversation_id,
            conversation.platform.as_str()
        );
        Ok(message)
    }

    /// Record a delivered message and refresh the conversation preview
    fn record(
        &self,
        conversation: &Conversation,
        payload: &OutboundPayload,
        receipt: &DeliveryReceipt,
    ) -> Result<Message, InboxError> {
        let body = match (&payload.media_url, &payload.media_type) {
            (Some(url), Some(media_type)) => MessageBody::Media {
                url: url.clone(),
                media_type: media_type.clone(),
                caption: payload.text.clone(),
            },
            _ => MessageBody::text(payload.text.clone().unwrap_or_default()),
        };

        let now = Utc::now();
        let message = Message::builder(
            MessageId::new(&receipt.message_id),
            conversation.id.clone(),
        )
        .direction(Direction::Outbound)
        .body(body)
        .sender(&self.sender.name, &self.sender.handle)
        .sent_at(now)
        .created_at(now)
        .read(true)
        .build();

        self.store.upsert_message(message.clone())?;

        let conversations = ConversationStore::new(self.store.clone());
        conversations.note_activity(&conversation.id, message.body.preview(), now, false)?;

        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryInboxStore;
    use crate::upload::AttachmentStorage;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeDelivery {
        calls: Mutex<Vec<OutboundPayload>>,
        fail: bool,
    }

    impl FakeDelivery {
        fn new(fail: bool) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                fail,
            }
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    impl DeliveryAdapter for FakeDelivery {
        fn deliver(&self, payload: &OutboundPayload) -> Result<DeliveryReceipt, InboxError> {
            self.calls.lock().unwrap().push(payload.clone());
            if self.fail {
                return Err(InboxError::DeliveryFailed("platform rejected".to_string()));
            }
            Ok(DeliveryReceipt {
                message_id: format!("out-{}", self.calls.lock().unwrap().len()),
            })
        }
    }

    struct FakeStorage {
        calls: AtomicUsize,
        fail: bool,
    }

    impl FakeStorage {
        fn new(fail: bool) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail,
            }
        }
    }

    impl AttachmentStorage for FakeStorage {
        fn put(&self, file_name: &str, _mime: &str, _data: &[u8]) -> Result<String, InboxError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(InboxError::Transport("storage down".to_string()));
            }
            Ok(format!("https://cdn.example.com/{}", file_name))
        }
    }

    struct Setup {
        store: Arc<InMemoryInboxStore>,
        delivery: Arc<FakeDelivery>,
        storage: Arc<FakeStorage>,
        dispatcher: OutboundDispatcher,
        log: MessageLog,
    }

    fn setup(delivery_fails: bool, storage_fails: bool) -> Setup {
        let store = Arc::new(InMemoryInboxStore::new());
        store
            .upsert_conversation(Conversation::new(
                ConversationId::new("c1"),
                "Ada",
                "+15550001111",
                Platform::Whatsapp,
                Utc::now(),
            ))
            .unwrap();

        let delivery = Arc::new(FakeDelivery::new(delivery_fails));
        let storage = Arc::new(FakeStorage::new(storage_fails));
        let dispatcher = OutboundDispatcher::new(
            store.clone(),
            delivery.clone(),
            AttachmentUploader::new(storage.clone()),
            SenderIdentity {
                name: "Workspace".to_string(),
                handle: "team@example.com".to_string(),
            },
        );

        Setup {
            store,
            delivery,
            storage,
            dispatcher,
            log: MessageLog::new(ConversationId::new("c1")),
        }
    }

    #[test]
    fn test_empty_draft_fails_without_network() {
        let mut s = setup(false, false);

        let err = s
            .dispatcher
            .send(&mut s.log, &Draft::text_only("   "))
            .unwrap_err();

        assert!(matches!(err, InboxError::EmptyDraft));
        assert_eq!(s.delivery.call_count(), 0);
        assert_eq!(s.storage.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_unknown_conversation_fails_before_delivery() {
        let mut s = setup(false, false);
        let mut log = MessageLog::new(ConversationId::new("ghost"));

        let err = s
            .dispatcher
            .send(&mut log, &Draft::text_only("hello"))
            .unwrap_err();

        assert!(matches!(err, InboxError::NotFound(_)));
        assert_eq!(s.delivery.call_count(), 0);
    }

    #[test]
    fn test_successful_text_send_records_message() {
        let mut s = setup(false, false);

        let message = s
            .dispatcher
            .send(&mut s.log, &Draft::text_only("  hello there  "))
            .unwrap();

        assert_eq!(message.direction, Direction::Outbound);
        assert_eq!(message.body, MessageBody::text("hello there"));
        assert_eq!(s.log.len(), 1);
        assert!(s.store.has_message(&message.id).unwrap());

        // Preview refreshed, status stays read for outbound activity
        let conversation = s
            .store
            .get_conversation(&ConversationId::new("c1"))
            .unwrap()
            .unwrap();
        assert_eq!(conversation.preview, "hello there");
    }

    #[test]
    fn test_upload_failure_aborts_before_delivery() {
        let mut s = setup(false, true);
        let draft = Draft::with_attachment(
            "see photo",
            LocalAttachment::new("photo.png", "image/png", vec![0; 128]),
        );

        let err = s.dispatcher.send(&mut s.log, &draft).unwrap_err();

        assert!(matches!(err, InboxError::UploadFailed(_)));
        assert_eq!(s.delivery.call_count(), 0);
        assert_eq!(s.log.len(), 0);
        assert_eq!(
            s.store
                .count_messages_in_conversation(&ConversationId::new("c1"))
                .unwrap(),
            0
        );
    }

    #[test]
    fn test_oversized_attachment_never_reaches_storage_or_delivery() {
        let mut s = setup(false, false);
        let draft = Draft::with_attachment(
            "",
            LocalAttachment::new("big.mp4", "video/mp4", vec![0; 12 * 1024 * 1024]),
        );

        let err = s.dispatcher.send(&mut s.log, &draft).unwrap_err();

        assert!(matches!(err, InboxError::TooLarge { .. }));
        assert_eq!(s.storage.calls.load(Ordering::SeqCst), 0);
        assert_eq!(s.delivery.call_count(), 0);
    }

    #[test]
    fn test_delivery_failure_records_nothing() {
        let mut s = setup(true, false);
        let draft = Draft::text_only("hello");

        let err = s.dispatcher.send(&mut s.log, &draft).unwrap_err();

        assert!(matches!(err, InboxError::DeliveryFailed(_)));
        assert_eq!(s.log.len(), 0);
        assert_eq!(
            s.store
                .count_messages_in_conversation(&ConversationId::new("c1"))
                .unwrap(),
            0
        );
        // Draft untouched for retry
        assert_eq!(draft.text, "hello");
    }

    #[test]
    fn test_media_send_builds_media_body() {
        let mut s = setup(false, false);
        let draft = Draft::with_attachment(
            "the invoice",
            LocalAttachment::new("invoice.pdf", "application/pdf", vec![0; 256]),
        );

        let message = s.dispatcher.send(&mut s.log, &draft).unwrap();

        match &message.body {
            MessageBody::Media {
                url,
                media_type,
                caption,
            } => {
                assert_eq!(url, "https://cdn.example.com/invoice.pdf");
                assert_eq!(media_type, "application/pdf");
                assert_eq!(caption.as_deref(), Some("the invoice"));
            }
            other => panic!("Expected media body, got {:?}", other),
        }

        let delivered = &s.delivery.calls.lock().unwrap()[0];
        assert_eq!(delivered.platform, Platform::Whatsapp);
        assert_eq!(
            delivered.media_url.as_deref(),
            Some("https://cdn.example.com/invoice.pdf")
        );
    }
}
