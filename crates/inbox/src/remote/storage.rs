//! Attachment storage service client

use serde::Deserialize;
use url::Url;

use crate::error::InboxError;
use crate::upload::AttachmentStorage;

use super::{agent, transport_error};

/// Client for the attachment storage service
///
/// Uploads raw file bytes and receives a durable URL in return.
pub struct StorageClient {
    agent: ureq::Agent,
    base_url: String,
    api_token: String,
}

/// Response from the upload endpoint
#[derive(Debug, Deserialize)]
struct UploadResponse {
    url: String,
}

impl StorageClient {
    pub fn new(base_url: impl Into<String>, api_token: impl Into<String>) -> Self {
        Self {
            agent: agent(),
            base_url: base_url.into(),
            api_token: api_token.into(),
        }
    }

    /// Build the upload URL with the file name as a query parameter
    fn upload_url(&self, file_name: &str) -> Result<Url, InboxError> {
        let mut url = Url::parse(&self.base_url)
            .and_then(|u| u.join("upload"))
            .map_err(|e| InboxError::Transport(format!("invalid storage URL: {}", e)))?;
        url.query_pairs_mut().append_pair("filename", file_name);
        Ok(url)
    }
}

impl AttachmentStorage for StorageClient {
    fn put(&self, file_name: &str, mime_type: &str, data: &[u8]) -> Result<String, InboxError> {
        let url = self.upload_url(file_name)?;

        let mut response = self
            .agent
            .post(url.as_str())
            .header("Authorization", &format!("Bearer {}", self.api_token))
            .header("Content-Type", mime_type)
            .send(data)
            .map_err(|e| match e {
                ureq::Error::StatusCode(code) => InboxError::UploadFailed(format!(
                    "storage service returned status {}",
                    code
                )),
                other => transport_error(other),
            })?;

        let uploaded: UploadResponse = response
            .body_mut()
            .read_json()
            .map_err(|e| InboxError::UploadFailed(format!("malformed upload response: {}", e)))?;

        Ok(uploaded.url)
    }
}
