//! Supabase Storage client. Uploads go through `storage/v1/object` with
//! `x-upsert: true` so re-running the batch overwrites instead of duplicating.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;

use super::ObjectStore;
use crate::config::ImportConfig;

pub struct BucketClient {
    http: Client,
    base_url: String,
    bucket: String,
    service_key: String,
}

impl BucketClient {
    pub fn new(config: &ImportConfig) -> Self {
        Self {
            http: Client::new(),
            base_url: config.supabase_url.trim_end_matches('/').to_string(),
            bucket: config.bucket.clone(),
            service_key: config.service_role_key.clone(),
        }
    }

    fn object_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/{}/{}",
            self.base_url, self.bucket, path
        )
    }

    /// Public objects resolve under `object/public` without any credential.
    pub fn public_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url, self.bucket, path
        )
    }
}

#[async_trait]
impl ObjectStore for BucketClient {
    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<String> {
        let resp = self
            .http
            .post(self.object_url(path))
            .bearer_auth(&self.service_key)
            .header("apikey", &self.service_key)
            .header("x-upsert", "true")
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await
            .with_context(|| format!("upload to bucket '{}' path '{}'", self.bucket, path))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(anyhow!("storage upload failed ({status}): {body}"));
        }
        Ok(self.public_url(path))
    }
}

/// Extension-based content type for the upload header; the export only ever
/// references images, anything else falls back to octet-stream.
pub fn guess_content_type(filename: &str) -> &'static str {
    let lower = filename.to_ascii_lowercase();
    if lower.ends_with(".png") {
        "image/png"
    } else if lower.ends_with(".jpg") || lower.ends_with(".jpeg") {
        "image/jpeg"
    } else if lower.ends_with(".gif") {
        "image/gif"
    } else if lower.ends_with(".webp") {
        "image/webp"
    } else if lower.ends_with(".svg") {
        "image/svg+xml"
    } else {
        "application/octet-stream"
    }
}
