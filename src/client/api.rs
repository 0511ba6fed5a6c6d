//! Catalog gateway client implementation.

use std::time::Duration;

use reqwest::Client;
use thiserror::Error;

use super::models::{SearchResponse, Track};

/// Default bound on a single lookup.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// API client errors.
#[derive(Debug, Error)]
pub enum ApiClientError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Gateway returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Upstream reported an error: {0}")]
    Upstream(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Client for the `/api/search` gateway endpoint.
#[derive(Debug, Clone)]
pub struct CatalogClient {
    /// HTTP client
    client: Client,

    /// Base gateway URL
    base_url: String,
}

impl CatalogClient {
    /// Create a new client with the given per-request timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ApiClientError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Base URL this client talks to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn search_url(&self, query: &str) -> String {
        format!(
            "{}/api/search?q={}",
            self.base_url,
            urlencoding::encode(query)
        )
    }

    /// Search the catalog. Tracks are returned in the order received.
    pub async fn search(&self, query: &str) -> Result<Vec<Track>, ApiClientError> {
        let url = self.search_url(query);
        tracing::debug!("GET {}", url);

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(ApiClientError::Status {
                status: status.as_u16(),
                message: error_message(&text),
            });
        }

        let parsed: SearchResponse = serde_json::from_str(&text).map_err(|e| {
            ApiClientError::InvalidResponse(format!(
                "Failed to parse response: {}. Body: {}",
                e,
                truncate(&text, 500)
            ))
        })?;

        if let Some(error) = parsed.error {
            return Err(ApiClientError::Upstream(error.to_string()));
        }

        Ok(parsed.data)
    }

    /// Fetch raw bytes (cover art).
    pub async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, ApiClientError> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    }
}

/// Pull the `error` field out of a gateway error payload, or fall back to the body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(String::from))
        .unwrap_or_else(|| truncate(body, 200).to_string())
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
