//! # Pulse Media
//!
//! Listing images live on an external media host. This crate uploads them
//! and removes them again when a listing is deleted.
//!
//! ```text
//!   multipart image ──► MediaHost::upload ──► secure URL stored on Property
//!   delete listing  ──► public_id(url) ──► MediaHost::destroy
//! ```
//!
//! [`CloudinaryClient`] speaks the signed upload API. [`RecordingMediaHost`]
//! keeps everything in memory for tests and local runs.

mod cloudinary;
mod recording;

use async_trait::async_trait;

use pulse_core::Result;

pub use cloudinary::{sign, CloudinaryClient};
pub use recording::RecordingMediaHost;

/// Fallback MIME type when a file part arrives without one.
pub const DEFAULT_CONTENT_TYPE: &str = "image/png";

/// One image file taken from the add-property form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: None,
            bytes,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Browsers send an unnamed empty part when no file was chosen.
    pub fn is_empty(&self) -> bool {
        self.file_name.trim().is_empty() || self.bytes.is_empty()
    }

    /// `data:<mime>;base64,<payload>`
    pub fn data_uri(&self) -> String {
        use base64::Engine;
        let mime = self.content_type.as_deref().unwrap_or(DEFAULT_CONTENT_TYPE);
        let payload = base64::engine::general_purpose::STANDARD.encode(&self.bytes);
        format!("data:{mime};base64,{payload}")
    }
}

#[async_trait]
pub trait MediaHost: Send + Sync {
    /// Store one image and return its secure URL.
    async fn upload(&self, image: &ImageUpload) -> Result<String>;

    /// Remove a stored image by public id.
    async fn destroy(&self, public_id: &str) -> Result<()>;

    /// Public id of an image previously returned by [`upload`](Self::upload).
    fn public_id(&self, url: &str) -> Option<String>;
}

/// `folder/<last path segment without extension>`
pub fn public_id_for(folder: &str, image_url: &str) -> Option<String> {
    let segment = match url::Url::parse(image_url) {
        Ok(parsed) => parsed
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .map(str::to_string),
        Err(_) => image_url.rsplit('/').next().map(str::to_string),
    }?;
    let stem = segment.split('.').next().unwrap_or_default();
    if stem.is_empty() {
        return None;
    }
    Some(format!("{folder}/{stem}"))
}
