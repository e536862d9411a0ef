//! Inbox service facade
//!
//! Wires the conversation directory, message history, realtime feed,
//! outbound dispatch and reply suggestions into one entry point. Hosts
//! construct the service once and drive everything through it.

use std::sync::{Arc, Mutex};

use log::info;

use crate::assist::{SuggestionAssistant, SuggestionService};
use crate::config::ServiceEndpoints;
use crate::conversations::ConversationStore;
use crate::dispatch::{DeliveryAdapter, Draft, OutboundDispatcher, SenderIdentity};
use crate::remote::{DeliveryClient, StorageClient, SuggestClient};
use crate::error::InboxError;
use crate::message_log::MessageLog;
use crate::models::{Conversation, ConversationId, Message};
use crate::realtime::{RealtimeSubscriber, RealtimeTransport, SubscriptionId};
use crate::storage::InboxStore;
use crate::upload::{AttachmentStorage, AttachmentUploader};

/// An opened conversation: its record, history and live feed
///
/// Owned by the view that opened it. Dropping it releases the realtime
/// subscription.
pub struct OpenConversation {
    pub conversation: Conversation,
    pub log: MessageLog,
    subscriber: RealtimeSubscriber,
}

impl OpenConversation {
    /// Whether the live feed is still attached
    pub fn is_live(&self) -> bool {
        self.subscriber.is_attached()
    }
}

/// Facade over the inbox core
///
/// Holds at most one active subscription id: opening a conversation
/// detaches whatever was attached before, whether or not the caller has
/// dropped the previous [`OpenConversation`].
pub struct InboxService {
    store: Arc<dyn InboxStore>,
    transport: Arc<dyn RealtimeTransport>,
    conversations: ConversationStore,
    dispatcher: OutboundDispatcher,
    assistant: SuggestionAssistant,
    active_subscription: Mutex<Option<SubscriptionId>>,
}

impl InboxService {
    pub fn new(
        store: Arc<dyn InboxStore>,
        transport: Arc<dyn RealtimeTransport>,
        delivery: Arc<dyn DeliveryAdapter>,
        attachment_storage: Arc<dyn AttachmentStorage>,
        suggestions: Arc<dyn SuggestionService>,
        sender: SenderIdentity,
    ) -> Self {
        let conversations = ConversationStore::new(store.clone());
        let dispatcher = OutboundDispatcher::new(
            store.clone(),
            delivery,
            AttachmentUploader::new(attachment_storage),
            sender,
        );
        let assistant = SuggestionAssistant::new(suggestions);

        Self {
            store,
            transport,
            conversations,
            dispatcher,
            assistant,
            active_subscription: Mutex::new(None),
        }
    }

    /// Construct a service backed by the remote HTTP collaborators
    pub fn with_endpoints(
        store: Arc<dyn InboxStore>,
        transport: Arc<dyn RealtimeTransport>,
        endpoints: &ServiceEndpoints,
        sender: SenderIdentity,
    ) -> Self {
        Self::new(
            store,
            transport,
            Arc::new(DeliveryClient::new(
                &endpoints.delivery_url,
                &endpoints.api_token,
            )),
            Arc::new(StorageClient::new(
                &endpoints.storage_url,
                &endpoints.api_token,
            )),
            Arc::new(SuggestClient::new(
                &endpoints.suggest_url,
                &endpoints.api_token,
            )),
            sender,
        )
    }

    /// Conversation directory, newest activity first
    pub fn list_conversations(
        &self,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Conversation>, InboxError> {
        self.conversations.list(limit, offset)
    }

    /// Open a conversation: resolve it, subscribe, load history, mark read
    ///
    /// Any subscription from a previous open is detached first, so a
    /// switch or re-open never leaves two live channels. The new
    /// subscription is attached before the history load, so a message
    /// inserted during the load arrives on both paths; the log absorbs the
    /// duplicate. A failed load leaves nothing open.
    pub fn open_conversation(
        &self,
        id: &ConversationId,
    ) -> Result<OpenConversation, InboxError> {
        let conversation = self.conversations.select(id)?;

        {
            let mut active = self.active_subscription.lock().unwrap();
            if let Some(previous) = active.take() {
                self.transport.detach(previous);
            }
        }

        let mut subscriber = RealtimeSubscriber::new(self.transport.clone());
        subscriber.attach(id)?;
        *self.active_subscription.lock().unwrap() = subscriber.subscription_id();

        let mut log = MessageLog::new(id.clone());
        log.load(self.store.as_ref())?;
        subscriber.pump(&mut log);

        self.conversations.mark_read(id)?;
        log.mark_all_read();

        info!("Opened conversation {} ({} messages)", id, log.len());
        Ok(OpenConversation {
            conversation,
            log,
            subscriber,
        })
    }

    /// Forward pending realtime inserts into the open conversation
    ///
    /// Returns the number of new messages. Refreshes the directory entry
    /// when something arrived; the conversation stays read while open.
    pub fn pump(&self, open: &mut OpenConversation) -> Result<usize, InboxError> {
        let appended = open.subscriber.pump(&mut open.log);
        if appended > 0 {
            if let Some(latest) = open.log.scroll_anchor() {
                self.conversations.note_activity(
                    open.log.conversation_id(),
                    latest.body.preview(),
                    latest.sent_at,
                    false,
                )?;
            }
        }
        Ok(appended)
    }

    /// Send a draft into the open conversation
    pub fn send(&self, open: &mut OpenConversation, draft: &Draft) -> Result<Message, InboxError> {
        self.dispatcher.send(&mut open.log, draft)
    }

    /// Draft a reply suggestion for the open conversation
    pub fn suggest(&self, open: &OpenConversation) -> Result<String, InboxError> {
        self.assistant.suggest(&open.conversation, &open.log)
    }

    /// Close an open conversation, releasing its subscription
    pub fn close(&self, mut open: OpenConversation) {
        let id = open.subscriber.subscription_id();
        open.subscriber.detach();

        let mut active = self.active_subscription.lock().unwrap();
        if *active == id {
            *active = None;
        }
    }

    pub fn mark_read(&self, id: &ConversationId) -> Result<(), InboxError> {
        self.conversations.mark_read(id)
    }

    pub fn archive(&self, id: &ConversationId) -> Result<(), InboxError> {
        self.conversations.archive(id)
    }

    pub fn unarchive(&self, id: &ConversationId) -> Result<(), InboxError> {
        self.conversations.unarchive(id)
    }

    pub fn set_tags(&self, id: &ConversationId, tags: Vec<String>) -> Result<(), InboxError> {
        self.conversations.set_tags(id, tags)
    }
}
