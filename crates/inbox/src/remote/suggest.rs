//! Reply suggestion service client

use serde::{Deserialize, Serialize};

use crate::assist::{SuggestionRequest, SuggestionService};
use crate::error::InboxError;

use super::{agent, transport_error};

/// Client for the reply suggestion service
pub struct SuggestClient {
    agent: ureq::Agent,
    base_url: String,
    api_token: String,
}

/// Request body for the suggest endpoint
#[derive(Serialize)]
struct SuggestBody<'a> {
    message_content: &'a str,
    conversation_context: &'a str,
    platform: &'a str,
}

/// Response from the suggest endpoint
#[derive(Debug, Deserialize)]
struct SuggestResponse {
    suggestion: String,
}

impl SuggestClient {
    pub fn new(base_url: impl Into<String>, api_token: impl Into<String>) -> Self {
        Self {
            agent: agent(),
            base_url: base_url.into(),
            api_token: api_token.into(),
        }
    }
}

impl SuggestionService for SuggestClient {
    fn suggest(&self, request: &SuggestionRequest) -> Result<String, InboxError> {
        let url = format!("{}/suggest", self.base_url.trim_end_matches('/'));
        let body = SuggestBody {
            message_content: &request.message_content,
            conversation_context: &request.conversation_context,
            platform: &request.platform,
        };

        let mut response = self
            .agent
            .post(&url)
            .header("Authorization", &format!("Bearer {}", self.api_token))
            .send_json(&body)
            .map_err(|e| match e {
                ureq::Error::StatusCode(code) => InboxError::Transport(format!(
                    "suggestion service returned status {}",
                    code
                )),
                other => transport_error(other),
            })?;

        let parsed: SuggestResponse = response
            .body_mut()
            .read_json()
            .map_err(|e| InboxError::Transport(format!("malformed suggestion response: {}", e)))?;

        Ok(parsed.suggestion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_shape() {
        let body = SuggestBody {
            message_content: "any update?",
            conversation_context: "Ada: any update?",
            platform: "email",
        };
        let json = serde_json::to_string(&body).unwrap();
        assert!(json.contains(r#""message_content":"any update?""#));
        assert!(json.contains(r#""platform":"email""#));
    }

    #[test]
    fn test_parse_suggestion() {
        let json = r#"{ "suggestion": "Thanks for the nudge, checking now." }"#;
        let parsed: SuggestResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.suggestion, "Thanks for the nudge, checking now.");
    }
}
