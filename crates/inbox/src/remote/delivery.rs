//! Message delivery service client

use serde::{Deserialize, Serialize};

use crate::dispatch::{DeliveryAdapter, DeliveryReceipt, OutboundPayload};
use crate::error::InboxError;

use super::{agent, transport_error};

/// Client for the outbound message delivery service
pub struct DeliveryClient {
    agent: ureq::Agent,
    base_url: String,
    api_token: String,
}

/// Request body for the send-message endpoint
#[derive(Serialize)]
struct SendMessageRequest<'a> {
    conversation_id: &'a str,
    platform: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    media_url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    media_type: Option<&'a str>,
}

/// Acknowledgement from the delivery service
#[derive(Debug, Deserialize)]
struct SendMessageResponse {
    success: bool,
    message_id: Option<String>,
    error: Option<String>,
}

impl DeliveryClient {
    pub fn new(base_url: impl Into<String>, api_token: impl Into<String>) -> Self {
        Self {
            agent: agent(),
            base_url: base_url.into(),
            api_token: api_token.into(),
        }
    }
}

impl DeliveryAdapter for DeliveryClient {
    fn deliver(&self, payload: &OutboundPayload) -> Result<DeliveryReceipt, InboxError> {
        let url = format!("{}/send-message", self.base_url.trim_end_matches('/'));
        let request = SendMessageRequest {
            conversation_id: payload.conversation_id.as_str(),
            platform: payload.platform.as_str(),
            text: payload.text.as_deref(),
            media_url: payload.media_url.as_deref(),
            media_type: payload.media_type.as_deref(),
        };

        let mut response = self
            .agent
            .post(&url)
            .header("Authorization", &format!("Bearer {}", self.api_token))
            .send_json(&request)
            .map_err(|e| match e {
                ureq::Error::StatusCode(code) => InboxError::DeliveryFailed(format!(
                    "delivery service returned status {}",
                    code
                )),
                other => transport_error(other),
            })?;

        let ack: SendMessageResponse = response
            .body_mut()
            .read_json()
            .map_err(|e| InboxError::DeliveryFailed(format!("malformed acknowledgement: {}", e)))?;

        if !ack.success {
            return Err(InboxError::DeliveryFailed(
                ack.error.unwrap_or_else(|| "delivery rejected".to_string()),
            ));
        }
        let message_id = ack.message_id.ok_or_else(|| {
            InboxError::DeliveryFailed("acknowledgement missing message id".to_string())
        })?;

        Ok(DeliveryReceipt { message_id })
    }
}
