//! HTTP client for the berita acara API.
//!
//! Provides a minimal client with GET/POST helpers, the domain methods the
//! CLI needs, and the concurrent upload scheduler that moves pending images
//! to storage through signed upload authorizations before a record is
//! submitted.

pub mod api;
pub mod form;
pub mod scheduler;

use anyhow::{Context, Result};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;

pub use scheduler::{drain_pending_uploads, UploadTransport};

/// API version prefix (e.g. "/api/v0"). Set ACARA_API_VERSION to match the server.
pub fn api_prefix() -> String {
    let version = std::env::var("ACARA_API_VERSION").unwrap_or_else(|_| "v0".to_string());
    format!("/api/{}", version)
}

/// HTTP client for the berita acara API.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Create client from environment: ACARA_API_URL (or API_URL).
    pub fn from_env() -> Result<Self> {
        let base_url = std::env::var("ACARA_API_URL")
            .or_else(|_| std::env::var("API_URL"))
            .unwrap_or_else(|_| "http://localhost:4000".to_string());

        Self::new(base_url)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// GET request with optional query parameters. Deserializes JSON response.
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let mut request = self.client.get(self.build_url(path));
        if !query.is_empty() {
            request = request.query(query);
        }

        let response = request.send().await.context("Failed to send request")?;
        let response = ensure_success(response).await?;

        response
            .json()
            .await
            .context("Failed to parse response as JSON")
    }

    /// POST JSON body and deserialize response.
    pub async fn post_json<T: DeserializeOwned, B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let response = self.post_json_raw(path, body).await?;

        response
            .json()
            .await
            .context("Failed to parse response as JSON")
    }

    /// POST JSON body and return the successful response untouched.
    pub async fn post_json_raw<B: serde::Serialize>(&self, path: &str, body: &B) -> Result<Response> {
        let response = self
            .client
            .post(self.build_url(path))
            .json(body)
            .send()
            .await
            .context("Failed to send request")?;

        ensure_success(response).await
    }

    /// Raw client for custom requests, e.g. PUTs to signed upload targets.
    pub fn client(&self) -> &Client {
        &self.client
    }
}

async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(anyhow::anyhow!(
        "API request failed with status {}: {}",
        status,
        error_text
    ))
}

// Re-export domain response types for convenience.
pub use acara_core::models::{RecordCreated, RecordSummary, UploadAuthorization};
