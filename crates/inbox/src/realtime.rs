//! Realtime subscription handling
//!
//! A push channel delivers newly inserted messages for one conversation.
//! The subscriber owns the attach/detach lifecycle and forwards events
//! into the owning view's [`MessageLog`] in arrival order; it is the only
//! writer into the log besides the view's own `load`.

use std::sync::Arc;
use std::sync::mpsc;

use log::{info, warn};

use crate::error::InboxError;
use crate::message_log::MessageLog;
use crate::models::{ConversationId, Message};

/// Identifier for an active subscription, assigned by the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// An acknowledged subscription: id plus the insert-event channel
pub struct Subscription {
    pub id: SubscriptionId,
    pub events: mpsc::Receiver<Message>,
}

/// Transport providing filtered insert notifications
///
/// `attach` returns only after the transport has acknowledged the filter;
/// the returned channel then carries every message inserted into the
/// subscribed conversation, in insertion order.
pub trait RealtimeTransport: Send + Sync {
    fn attach(&self, conversation_id: &ConversationId) -> Result<Subscription, InboxError>;

    fn detach(&self, id: SubscriptionId);
}

/// Lifecycle state of a subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriberState {
    Detached,
    Attaching,
    Attached,
}

/// Maintains at most one live subscription and forwards its events
///
/// State machine: `Detached -> Attaching -> Attached`, back to `Detached`
/// on explicit close or on transport error. There is no automatic
/// reconnect: after a transport-level disconnect, live updates stop until
/// the conversation is reopened.
pub struct RealtimeSubscriber {
    transport: Arc<dyn RealtimeTransport>,
    state: SubscriberState,
    active: Option<ActiveSubscription>,
}

struct ActiveSubscription {
    conversation_id: ConversationId,
    id: SubscriptionId,
    events: mpsc::Receiver<Message>,
}

impl RealtimeSubscriber {
    pub fn new(transport: Arc<dyn RealtimeTransport>) -> Self {
        Self {
            transport,
            state: SubscriberState::Detached,
            active: None,
        }
    }

    pub fn state(&self) -> SubscriberState {
        self.state
    }

    pub fn is_attached(&self) -> bool {
        self.state == SubscriberState::Attached
    }

    /// Conversation currently subscribed to, if any
    pub fn conversation_id(&self) -> Option<&ConversationId> {
        self.active.as_ref().map(|a| &a.conversation_id)
    }

    /// Transport id of the active subscription, if any
    pub fn subscription_id(&self) -> Option<SubscriptionId> {
        self.active.as_ref().map(|a| a.id)
    }

    /// Attach to a conversation's insert feed
    ///
    /// Any existing subscription is detached first, so at most one channel
    /// is live per subscriber. Reaches `Attached` only once the transport
    /// acknowledges; on failure the subscriber is left `Detached` and the
    /// error is surfaced.
    pub fn attach(&mut self, conversation_id: &ConversationId) -> Result<(), InboxError> {
        self.detach();

        self.state = SubscriberState::Attaching;
        match self.transport.attach(conversation_id) {
            Ok(subscription) => {
                info!("Subscribed to {}", conversation_id);
                self.active = Some(ActiveSubscription {
                    conversation_id: conversation_id.clone(),
                    id: subscription.id,
                    events: subscription.events,
                });
                self.state = SubscriberState::Attached;
                Ok(())
            }
            Err(e) => {
                self.state = SubscriberState::Detached;
                Err(e)
            }
        }
    }

    /// Release the active subscription, if any
    pub fn detach(&mut self) {
        if let Some(active) = self.active.take() {
            info!("Unsubscribing from {}", active.conversation_id);
            self.transport.detach(active.id);
        }
        self.state = SubscriberState::Detached;
    }

    /// Forward pending insert events into the log
    ///
    /// Returns the number of messages actually appended (duplicates are
    /// absorbed by the log). A disconnected channel moves the subscriber
    /// to `Detached`; the caller sees updates stop, not an error.
    pub fn pump(&mut self, log: &mut MessageLog) -> usize {
        let Some(active) = self.active.as_ref() else {
            return 0;
        };

        let mut appended = 0;
        let mut disconnected = false;
        loop {
            match active.events.try_recv() {
                Ok(message) => {
                    if log.append(message) {
                        appended += 1;
                    }
                }
                Err(mpsc::TryRecvError::Empty) => break,
                Err(mpsc::TryRecvError::Disconnected) => {
                    warn!(
                        "Realtime channel for {} closed by transport",
                        active.conversation_id
                    );
                    disconnected = true;
                    break;
                }
            }
        }

        if disconnected {
            if let Some(active) = self.active.take() {
                self.transport.detach(active.id);
            }
            self.state = SubscriberState::Detached;
        }
        appended
    }
}

impl Drop for RealtimeSubscriber {
    fn drop(&mut self) {
        self.detach();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Direction, MessageId};
    use chrono::Utc;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

    /// Transport double that records attach/detach calls and lets tests
    /// push events through the channel.
    struct FakeTransport {
        senders: Mutex<HashMap<u64, mpsc::Sender<Message>>>,
        next_id: AtomicU64,
        fail_attach: AtomicBool,
    }

    impl FakeTransport {
        fn new() -> Self {
            Self {
                senders: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                fail_attach: AtomicBool::new(false),
            }
        }

        fn deliver(&self, message: Message) {
            let senders = self.senders.lock().unwrap();
            for sender in senders.values() {
                sender.send(message.clone()).unwrap();
            }
        }

        fn drop_channel(&self, id: SubscriptionId) {
            self.senders.lock().unwrap().remove(&id.0);
        }

        fn active_count(&self) -> usize {
            self.senders.lock().unwrap().len()
        }
    }

    impl RealtimeTransport for FakeTransport {
        fn attach(&self, _conversation_id: &ConversationId) -> Result<Subscription, InboxError> {
            if self.fail_attach.load(Ordering::SeqCst) {
                return Err(InboxError::Transport("subscription refused".to_string()));
            }
            let id = self.next_id.fetch_add(1, Ordering::SeqCst);
            let (tx, rx) = mpsc::channel();
            self.senders.lock().unwrap().insert(id, tx);
            Ok(Subscription {
                id: SubscriptionId(id),
                events: rx,
            })
        }

        fn detach(&self, id: SubscriptionId) {
            self.senders.lock().unwrap().remove(&id.0);
        }
    }

    fn make_message(id: &str, conversation_id: &str, age_minutes: i64) -> Message {
        Message::builder(MessageId::new(id), ConversationId::new(conversation_id))
            .direction(Direction::Inbound)
            .text(format!("Body for {}", id))
            .sender("Ada", "ada@example.com")
            .sent_at(Utc::now() - chrono::Duration::minutes(age_minutes))
            .build()
    }

    #[test]
    fn test_attach_reaches_attached() {
        let transport = Arc::new(FakeTransport::new());
        let mut subscriber = RealtimeSubscriber::new(transport.clone());
        assert_eq!(subscriber.state(), SubscriberState::Detached);

        subscriber.attach(&ConversationId::new("c1")).unwrap();
        assert_eq!(subscriber.state(), SubscriberState::Attached);
        assert_eq!(transport.active_count(), 1);
    }

    #[test]
    fn test_attach_failure_returns_to_detached() {
        let transport = Arc::new(FakeTransport::new());
        transport.fail_attach.store(true, Ordering::SeqCst);
        let mut subscriber = RealtimeSubscriber::new(transport.clone());

        let err = subscriber.attach(&ConversationId::new("c1")).unwrap_err();
        assert!(matches!(err, InboxError::Transport(_)));
        assert_eq!(subscriber.state(), SubscriberState::Detached);
        assert_eq!(transport.active_count(), 0);
    }

    #[test]
    fn test_pump_forwards_inserts_in_arrival_order() {
        let transport = Arc::new(FakeTransport::new());
        let mut subscriber = RealtimeSubscriber::new(transport.clone());
        let mut log = MessageLog::new(ConversationId::new("c1"));

        subscriber.attach(&ConversationId::new("c1")).unwrap();
        transport.deliver(make_message("m1", "c1", 10));
        transport.deliver(make_message("m2", "c1", 5));

        assert_eq!(subscriber.pump(&mut log), 2);
        let ids: Vec<&str> = log.messages().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["m1", "m2"]);
    }

    #[test]
    fn test_duplicate_delivery_absorbed_by_log() {
        let transport = Arc::new(FakeTransport::new());
        let mut subscriber = RealtimeSubscriber::new(transport.clone());
        let mut log = MessageLog::new(ConversationId::new("c1"));

        subscriber.attach(&ConversationId::new("c1")).unwrap();
        let message = make_message("m1", "c1", 1);
        transport.deliver(message.clone());
        transport.deliver(message);

        assert_eq!(subscriber.pump(&mut log), 1);
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_switching_conversations_detaches_previous() {
        let transport = Arc::new(FakeTransport::new());
        let mut subscriber = RealtimeSubscriber::new(transport.clone());

        subscriber.attach(&ConversationId::new("c1")).unwrap();
        subscriber.attach(&ConversationId::new("c2")).unwrap();

        // Only the c2 channel is live
        assert_eq!(transport.active_count(), 1);
        assert_eq!(
            subscriber.conversation_id(),
            Some(&ConversationId::new("c2"))
        );
    }

    #[test]
    fn test_transport_disconnect_moves_to_detached() {
        let transport = Arc::new(FakeTransport::new());
        let mut subscriber = RealtimeSubscriber::new(transport.clone());
        let mut log = MessageLog::new(ConversationId::new("c1"));

        subscriber.attach(&ConversationId::new("c1")).unwrap();
        transport.deliver(make_message("m1", "c1", 1));
        transport.drop_channel(SubscriptionId(1));

        // Buffered event still delivered, then the close is observed
        assert_eq!(subscriber.pump(&mut log), 1);
        assert_eq!(subscriber.state(), SubscriberState::Detached);

        // No reconnect: further pumps are inert
        assert_eq!(subscriber.pump(&mut log), 0);
        assert_eq!(subscriber.state(), SubscriberState::Detached);
    }

    #[test]
    fn test_drop_releases_subscription() {
        let transport = Arc::new(FakeTransport::new());
        {
            let mut subscriber = RealtimeSubscriber::new(transport.clone());
            subscriber.attach(&ConversationId::new("c1")).unwrap();
            assert_eq!(transport.active_count(), 1);
        }
        assert_eq!(transport.active_count(), 0);
    }
}
