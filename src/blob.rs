//! Blob store publishing.
//!
//! Every cached artifact ends its life here: a JSON document PUT to a
//! deterministic slash-separated path, tagged with a cache-control lifetime.
//! Writes are idempotent full-document replacements, so last-writer-wins needs
//! no coordination beyond what the store itself provides.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::config::HTTP_TIMEOUT_SECS;

/// Write interface to the public blob store. A failed upload is an
/// infrastructure failure, never a data problem, and callers treat it as fatal
/// for the current run.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Upload `value` to `path` with the given cache-control directive and
    /// return the public URL of the published blob.
    async fn upload(&self, path: &str, value: &Value, cache_control: &str) -> Result<String>;
}

/// HTTP-backed blob store client.
pub struct HttpBlobStore {
    http: reqwest::Client,
    base_url: String,
    public_base: String,
    token: Option<String>,
}

impl HttpBlobStore {
    pub fn new(base_url: &str, public_base: &str, token: Option<String>) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
                .build()
                .expect("Failed to build HTTP client"),
            base_url: base_url.trim_end_matches('/').to_string(),
            public_base: public_base.trim_end_matches('/').to_string(),
            token,
        }
    }
}

#[async_trait]
impl BlobStore for HttpBlobStore {
    async fn upload(&self, path: &str, value: &Value, cache_control: &str) -> Result<String> {
        let url = format!("{}/{}", self.base_url, path);
        let body = serde_json::to_vec(value)
            .with_context(|| format!("serializing blob body for {path}"))?;

        let mut request = self
            .http
            .put(&url)
            .header("content-type", "application/json")
            .header("cache-control", cache_control)
            .body(body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let resp = request
            .send()
            .await
            .with_context(|| format!("uploading blob {path}"))?;
        if !resp.status().is_success() {
            bail!("blob store returned {} for {}", resp.status(), path);
        }

        let public_url = format!("{}/{}", self.public_base, path);
        debug!("[BLOB] uploaded {} ({})", path, cache_control);
        Ok(public_url)
    }
}
