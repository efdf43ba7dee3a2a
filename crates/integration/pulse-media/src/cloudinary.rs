//! Signed upload API client.

use async_trait::async_trait;
use reqwest::multipart::Form;
use serde::Deserialize;
use sha1::{Digest, Sha1};
use tracing::{debug, info, warn};

use pulse_config::MediaConfig;
use pulse_core::{Error, Result};

use crate::{public_id_for, ImageUpload, MediaHost};

/// Sign request parameters: `k1=v1&k2=v2` in key order, secret appended,
/// SHA-1, lowercase hex.
pub fn sign(params: &[(&str, &str)], secret: &str) -> String {
    let mut sorted = params.to_vec();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    let joined = sorted
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");
    let mut hasher = Sha1::new();
    hasher.update(joined.as_bytes());
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

/// Client for the hosted media API
pub struct CloudinaryClient {
    config: MediaConfig,
    http: reqwest::Client,
}

impl CloudinaryClient {
    pub fn new(config: MediaConfig) -> Result<Self> {
        if !config.is_configured() {
            return Err(Error::unavailable("media host credentials are not configured"));
        }
        info!(cloud = %config.cloud_name, folder = %config.folder, "Media host configured");
        Ok(Self {
            config,
            http: reqwest::Client::new(),
        })
    }

    fn endpoint(&self, action: &str) -> String {
        format!(
            "{}/{}/image/{}",
            self.config.api_base.trim_end_matches('/'),
            self.config.cloud_name,
            action
        )
    }

    fn timestamp() -> String {
        chrono::Utc::now().timestamp().to_string()
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let resp = request
            .send()
            .await
            .map_err(|e| Error::unavailable(format!("media host: {e}")))?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::unavailable(format!("media host returned {status}: {body}")));
        }
        Ok(resp)
    }
}

#[async_trait]
impl MediaHost for CloudinaryClient {
    async fn upload(&self, image: &ImageUpload) -> Result<String> {
        let timestamp = Self::timestamp();
        let signature = sign(
            &[("folder", self.config.folder.as_str()), ("timestamp", timestamp.as_str())],
            &self.config.api_secret,
        );
        let form = Form::new()
            .text("file", image.data_uri())
            .text("folder", self.config.folder.clone())
            .text("timestamp", timestamp)
            .text("api_key", self.config.api_key.clone())
            .text("signature", signature);

        let resp = self
            .send(self.http.post(self.endpoint("upload")).multipart(form))
            .await?;
        let body: UploadResponse = resp
            .json()
            .await
            .map_err(|e| Error::unavailable(format!("media host response: {e}")))?;
        debug!(file = %image.file_name, url = %body.secure_url, "Image uploaded");
        Ok(body.secure_url)
    }

    async fn destroy(&self, public_id: &str) -> Result<()> {
        let timestamp = Self::timestamp();
        let signature = sign(
            &[("public_id", public_id), ("timestamp", timestamp.as_str())],
            &self.config.api_secret,
        );
        let params = [
            ("public_id", public_id),
            ("timestamp", timestamp.as_str()),
            ("api_key", self.config.api_key.as_str()),
            ("signature", signature.as_str()),
        ];
        let resp = self
            .send(self.http.post(self.endpoint("destroy")).form(&params))
            .await?;
        let body: DestroyResponse = resp
            .json()
            .await
            .map_err(|e| Error::unavailable(format!("media host response: {e}")))?;
        if body.result != "ok" {
            warn!(public_id, result = %body.result, "Image was not destroyed");
        }
        Ok(())
    }

    fn public_id(&self, url: &str) -> Option<String> {
        public_id_for(&self.config.folder, url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_sorts_parameters() {
        let a = sign(&[("timestamp", "1315060510"), ("folder", "propertypulse")], "abcd");
        let b = sign(&[("folder", "propertypulse"), ("timestamp", "1315060510")], "abcd");
        assert_eq!(a, b);
        assert_eq!(a, "dcf3f0192efe1c86f4ecef62fd95bf483b578418");
    }

    #[test]
    fn destroy_signature() {
        let sig = sign(
            &[("public_id", "propertypulse/abc123"), ("timestamp", "1315060510")],
            "abcd",
        );
        assert_eq!(sig, "268e0a745661cbe18d0eb6541ec3e1f017c7c98e");
    }

    #[test]
    fn unconfigured_client_is_rejected() {
        assert!(matches!(
            CloudinaryClient::new(MediaConfig::default()),
            Err(Error::DependencyUnavailable(_))
        ));
    }

    #[test]
    fn endpoint_includes_cloud_and_action() {
        let client = CloudinaryClient::new(MediaConfig {
            cloud_name: "demo".into(),
            api_key: "k".into(),
            api_secret: "s".into(),
            api_base: "https://api.example.test/v1_1/".into(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(
            client.endpoint("upload"),
            "https://api.example.test/v1_1/demo/image/upload"
        );
    }
}
