//! Compose-side attachment model
//!
//! An attachment is a transient, locally selected file. It only becomes a
//! durable media URL after a successful upload; until then it is owned
//! exclusively by the composing client.

use std::path::PathBuf;

/// Handle to a spooled preview file for a pending attachment
///
/// The file is removed when the handle is dropped, so clearing the
/// attachment or completing a send releases the preview automatically.
#[derive(Debug)]
pub struct PreviewHandle {
    path: PathBuf,
}

impl PreviewHandle {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                log::warn!("Failed to remove preview file {}: {}", self.path.display(), e);
            }
        }
    }
}

/// A locally selected file waiting to be uploaded
#[derive(Debug)]
pub struct LocalAttachment {
    /// Original file name, used for the storage object name
    pub file_name: String,
    /// Declared MIME type
    pub mime_type: String,
    /// File contents
    pub data: Vec<u8>,
    /// Optional spooled preview, released with the attachment
    preview: Option<PreviewHandle>,
}

impl LocalAttachment {
    pub fn new(
        file_name: impl Into<String>,
        mime_type: impl Into<String>,
        data: Vec<u8>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            data,
            preview: None,
        }
    }

    /// Attach a spooled preview file to this attachment
    pub fn with_preview(mut self, preview: PreviewHandle) -> Self {
        self.preview = Some(preview);
        self
    }

    pub fn size_bytes(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn preview_path(&self) -> Option<&std::path::Path> {
        self.preview.as_ref().map(|p| p.path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preview.png");
        std::fs::write(&path, b"thumbnail").unwrap();

        let attachment = LocalAttachment::new("photo.png", "image/png", vec![1, 2, 3])
            .with_preview(PreviewHandle::new(&path));
        assert!(path.exists());

        drop(attachment);
        assert!(!path.exists());
    }

    #[test]
    fn test_size_bytes() {
        let attachment = LocalAttachment::new("doc.pdf", "application/pdf", vec![0; 1024]);
        assert_eq!(attachment.size_bytes(), 1024);
    }
}
