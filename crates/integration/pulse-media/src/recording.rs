//! In-memory media host.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use tracing::debug;

use pulse_core::{Error, Result};

use crate::{public_id_for, ImageUpload, MediaHost};

#[derive(Default)]
struct Log {
    uploaded: Vec<String>,
    destroyed: Vec<String>,
}

/// Hands out fake URLs and records every call.
pub struct RecordingMediaHost {
    base_url: String,
    folder: String,
    fail_uploads: bool,
    fail_destroys: bool,
    log: Mutex<Log>,
}

impl RecordingMediaHost {
    pub fn new(folder: impl Into<String>) -> Self {
        Self {
            base_url: "https://media.invalid".into(),
            folder: folder.into(),
            fail_uploads: false,
            fail_destroys: false,
            log: Mutex::new(Log::default()),
        }
    }

    pub fn failing_uploads(mut self) -> Self {
        self.fail_uploads = true;
        self
    }

    pub fn failing_destroys(mut self) -> Self {
        self.fail_destroys = true;
        self
    }

    fn log(&self) -> MutexGuard<'_, Log> {
        self.log.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn uploaded(&self) -> Vec<String> {
        self.log().uploaded.clone()
    }

    pub fn destroyed(&self) -> Vec<String> {
        self.log().destroyed.clone()
    }
}

#[async_trait]
impl MediaHost for RecordingMediaHost {
    async fn upload(&self, image: &ImageUpload) -> Result<String> {
        if self.fail_uploads {
            return Err(Error::unavailable("media host: upload refused"));
        }
        let mut log = self.log();
        let ext = image
            .file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext)
            .unwrap_or("png");
        let url = format!(
            "{}/{}/img{}.{}",
            self.base_url,
            self.folder,
            log.uploaded.len() + 1,
            ext
        );
        log.uploaded.push(url.clone());
        debug!(%url, "Recorded upload");
        Ok(url)
    }

    async fn destroy(&self, public_id: &str) -> Result<()> {
        if self.fail_destroys {
            return Err(Error::unavailable("media host: destroy refused"));
        }
        self.log().destroyed.push(public_id.to_string());
        Ok(())
    }

    fn public_id(&self, url: &str) -> Option<String> {
        public_id_for(&self.folder, url)
    }
}
