//! Event photo uploads to an unsigned-preset image host.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use tracing::instrument;
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum ImageHostError {
    #[error("image uploads are not configured")]
    NotConfigured,
    #[error("image host request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("image host returned {0}")]
    Status(u16),
    #[error("image host response has no URL")]
    MissingUrl,
}

#[derive(Clone, Debug)]
pub struct Upload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[async_trait]
pub trait ImageHost: Send + Sync {
    /// Store the image and return its public URL.
    async fn upload(&self, upload: Upload) -> Result<String, ImageHostError>;
}

/// Used when no upload URL is configured.
#[derive(Clone, Debug, Default)]
pub struct DisabledImageHost;

#[async_trait]
impl ImageHost for DisabledImageHost {
    async fn upload(&self, _upload: Upload) -> Result<String, ImageHostError> {
        Err(ImageHostError::NotConfigured)
    }
}

#[derive(Clone, Debug)]
pub struct HttpImageHost {
    client: reqwest::Client,
    url: Url,
    preset: String,
}

impl HttpImageHost {
    #[must_use]
    pub fn new(client: reqwest::Client, url: Url, preset: impl Into<String>) -> Self {
        Self {
            client,
            url,
            preset: preset.into(),
        }
    }
}

/// Prefer `secure_url`, fall back to `url`.
fn uploaded_url(body: &Value) -> Option<String> {
    ["secure_url", "url"]
        .iter()
        .filter_map(|key| body.get(*key).and_then(Value::as_str))
        .find(|value| !value.is_empty())
        .map(ToString::to_string)
}

#[async_trait]
impl ImageHost for HttpImageHost {
    #[instrument(skip(self, upload), fields(file_name = %upload.file_name, size = upload.bytes.len()))]
    async fn upload(&self, upload: Upload) -> Result<String, ImageHostError> {
        let mut part = Part::bytes(upload.bytes).file_name(upload.file_name);
        if let Some(content_type) = upload.content_type.as_deref() {
            part = part.mime_str(content_type)?;
        }
        let form = Form::new()
            .part("file", part)
            .text("upload_preset", self.preset.clone());

        let response = self
            .client
            .post(self.url.clone())
            .multipart(form)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ImageHostError::Status(status.as_u16()));
        }
        let body: Value = response.json().await?;
        uploaded_url(&body).ok_or(ImageHostError::MissingUrl)
    }
}
