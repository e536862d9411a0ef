//! Reply suggestion drafting
//!
//! Builds a suggestion request from the tail of a conversation and asks
//! the suggestion service for a draft reply. Strictly best-effort: a
//! failure here never touches conversation or message state, the compose
//! box just stays empty.

use std::sync::Arc;

use log::debug;

use crate::error::InboxError;
use crate::message_log::MessageLog;
use crate::models::{Conversation, Direction, Message};

/// Number of trailing messages included as context
pub const CONTEXT_WINDOW: usize = 5;

/// Request handed to the suggestion service
#[derive(Debug, Clone, PartialEq)]
pub struct SuggestionRequest {
    /// The inbound message being replied to
    pub message_content: String,
    /// Recent exchange, one "Sender: text" line per message
    pub conversation_context: String,
    /// Platform wire name, so the tone can match the medium
    pub platform: String,
}

/// Service producing a draft reply for a suggestion request
pub trait SuggestionService: Send + Sync {
    fn suggest(&self, request: &SuggestionRequest) -> Result<String, InboxError>;
}

/// Drafts reply suggestions from recent conversation context
pub struct SuggestionAssistant {
    service: Arc<dyn SuggestionService>,
}

impl SuggestionAssistant {
    pub fn new(service: Arc<dyn SuggestionService>) -> Self {
        Self { service }
    }

    /// Draft a reply to the latest inbound message
    ///
    /// The request carries the most recent inbound message in the context
    /// window plus the window itself as labelled lines. Fails with
    /// [`InboxError::NoContext`] when the window holds no inbound message
    /// to reply to.
    pub fn suggest(
        &self,
        conversation: &Conversation,
        log: &MessageLog,
    ) -> Result<String, InboxError> {
        let window: Vec<&Message> = log.tail(CONTEXT_WINDOW).collect();

        let latest_inbound = window
            .iter()
            .rev()
            .find(|m| m.direction == Direction::Inbound)
            .ok_or(InboxError::NoContext)?;

        let context = window
            .iter()
            .map(|m| format!("{}: {}", m.sender_name, m.body.preview()))
            .collect::<Vec<_>>()
            .join("\n");

        let request = SuggestionRequest {
            message_content: latest_inbound.body.preview().to_string(),
            conversation_context: context,
            platform: conversation.platform.as_str().to_string(),
        };

        debug!(
            "Requesting suggestion for {} ({} context messages)",
            conversation.id,
            window.len()
        );
        self.service.suggest(&request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConversationId, MessageId, Platform};
    use chrono::{Duration, Utc};
    use std::sync::Mutex;

    struct FakeService {
        requests: Mutex<Vec<SuggestionRequest>>,
        fail: bool,
    }

    impl FakeService {
        fn new(fail: bool) -> Self {
            Self {
                requests: Mutex::new(Vec::new()),
                fail,
            }
        }
    }

    impl SuggestionService for FakeService {
        fn suggest(&self, request: &SuggestionRequest) -> Result<String, InboxError> {
            self.requests.lock().unwrap().push(request.clone());
            if self.fail {
                return Err(InboxError::Timeout("suggestion service".to_string()));
            }
            Ok("Thanks, I will take a look.".to_string())
        }
    }

    fn make_conversation() -> Conversation {
        Conversation::new(
            ConversationId::new("c1"),
            "Ada",
            "ada@example.com",
            Platform::Email,
            Utc::now(),
        )
    }

    fn push(log: &mut MessageLog, id: &str, direction: Direction, text: &str, age_minutes: i64) {
        let message = Message::builder(MessageId::new(id), ConversationId::new("c1"))
            .direction(direction)
            .text(text)
            .sender(
                match direction {
                    Direction::Inbound => "Ada",
                    Direction::Outbound => "Workspace",
                },
                "x@example.com",
            )
            .sent_at(Utc::now() - Duration::minutes(age_minutes))
            .build();
        log.append(message);
    }

    #[test]
    fn test_suggest_replies_to_latest_inbound() {
        let service = Arc::new(FakeService::new(false));
        let assistant = SuggestionAssistant::new(service.clone());
        let mut log = MessageLog::new(ConversationId::new("c1"));
        push(&mut log, "m1", Direction::Inbound, "is it fixed?", 10);
        push(&mut log, "m2", Direction::Outbound, "checking now", 5);
        push(&mut log, "m3", Direction::Inbound, "any update?", 1);

        let suggestion = assistant.suggest(&make_conversation(), &log).unwrap();
        assert_eq!(suggestion, "Thanks, I will take a look.");

        let requests = service.requests.lock().unwrap();
        assert_eq!(requests[0].message_content, "any update?");
        assert_eq!(requests[0].platform, "email");
        assert_eq!(
            requests[0].conversation_context,
            "Ada: is it fixed?\nWorkspace: checking now\nAda: any update?"
        );
    }

    #[test]
    fn test_context_limited_to_window() {
        let service = Arc::new(FakeService::new(false));
        let assistant = SuggestionAssistant::new(service.clone());
        let mut log = MessageLog::new(ConversationId::new("c1"));
        for i in 0..8 {
            push(
                &mut log,
                &format!("m{}", i),
                Direction::Inbound,
                &format!("line {}", i),
                80 - i * 10,
            );
        }

        assistant.suggest(&make_conversation(), &log).unwrap();

        let requests = service.requests.lock().unwrap();
        let lines: Vec<&str> = requests[0].conversation_context.lines().collect();
        assert_eq!(lines.len(), CONTEXT_WINDOW);
        assert_eq!(lines[0], "Ada: line 3");
        assert_eq!(requests[0].message_content, "line 7");
    }

    #[test]
    fn test_no_inbound_in_window_is_no_context() {
        let service = Arc::new(FakeService::new(false));
        let assistant = SuggestionAssistant::new(service.clone());
        let mut log = MessageLog::new(ConversationId::new("c1"));
        push(&mut log, "m1", Direction::Outbound, "following up", 1);

        let err = assistant.suggest(&make_conversation(), &log).unwrap_err();
        assert!(matches!(err, InboxError::NoContext));
        assert!(service.requests.lock().unwrap().is_empty());
    }

    #[test]
    fn test_empty_log_is_no_context() {
        let assistant = SuggestionAssistant::new(Arc::new(FakeService::new(false)));
        let log = MessageLog::new(ConversationId::new("c1"));

        let err = assistant.suggest(&make_conversation(), &log).unwrap_err();
        assert!(matches!(err, InboxError::NoContext));
    }

    #[test]
    fn test_service_failure_surfaces() {
        let assistant = SuggestionAssistant::new(Arc::new(FakeService::new(true)));
        let mut log = MessageLog::new(ConversationId::new("c1"));
        push(&mut log, "m1", Direction::Inbound, "hello?", 1);

        let err = assistant.suggest(&make_conversation(), &log).unwrap_err();
        assert!(matches!(err, InboxError::Timeout(_)));
    }
}
