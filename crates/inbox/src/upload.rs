//! Attachment upload handling
//!
//! Validates a locally selected file and hands it to the attachment
//! storage service in exchange for a durable URL. Validation happens
//! before the storage boundary is contacted, so an oversized or
//! unsupported file never generates network traffic.

use std::sync::Arc;

use log::info;

use crate::error::InboxError;
use crate::models::LocalAttachment;

/// Maximum accepted attachment size (10 MiB)
pub const MAX_ATTACHMENT_BYTES: u64 = 10 * 1024 * 1024;

/// MIME type prefixes and exact types accepted by the storage boundary
const ALLOWED_MIME_PREFIXES: &[&str] = &["image/", "video/", "audio/"];
const ALLOWED_MIME_EXACT: &[&str] = &["application/pdf", "text/plain"];

/// Storage service accepting uploads and returning durable URLs
pub trait AttachmentStorage: Send + Sync {
    /// Upload a file, returning its durable URL
    fn put(&self, file_name: &str, mime_type: &str, data: &[u8]) -> Result<String, InboxError>;
}

/// Check whether a MIME type is accepted at the storage boundary
pub fn is_supported_mime(mime_type: &str) -> bool {
    ALLOWED_MIME_PREFIXES
        .iter()
        .any(|prefix| mime_type.starts_with(prefix))
        || ALLOWED_MIME_EXACT.contains(&mime_type)
}

/// Uploads compose-side attachments to the storage service
pub struct AttachmentUploader {
    storage: Arc<dyn AttachmentStorage>,
    max_bytes: u64,
}

impl AttachmentUploader {
    pub fn new(storage: Arc<dyn AttachmentStorage>) -> Self {
        Self {
            storage,
            max_bytes: MAX_ATTACHMENT_BYTES,
        }
    }

    /// Override the size cap (for hosts with tighter platform limits)
    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// Upload an attachment and return its durable URL
    ///
    /// Fails with [`InboxError::TooLarge`] or
    /// [`InboxError::UnsupportedMedia`] before the storage service is
    /// contacted, and [`InboxError::UploadFailed`] on a storage failure.
    pub fn upload(&self, attachment: &LocalAttachment) -> Result<String, InboxError> {
        let size_bytes = attachment.size_bytes();
        if size_bytes > self.max_bytes {
            return Err(InboxError::TooLarge {
                size_bytes,
                limit_bytes: self.max_bytes,
            });
        }
        if !is_supported_mime(&attachment.mime_type) {
            return Err(InboxError::UnsupportedMedia(attachment.mime_type.clone()));
        }

        let url = self
            .storage
            .put(&attachment.file_name, &attachment.mime_type, &attachment.data)
            .map_err(|e| match e {
                // Preserve transport detail but present it as an upload failure
                InboxError::Transport(msg) | InboxError::Timeout(msg) => {
                    InboxError::UploadFailed(msg)
                }
                other => other,
            })?;

        info!(
            "Uploaded attachment {} ({} bytes) -> {}",
            attachment.file_name, size_bytes, url
        );
        Ok(url)
    }
}
