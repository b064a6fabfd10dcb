//! Page sources: where single result pages come from.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use super::config::SearchConfig;
use super::types::{PageRequest, Paging, SearchHit, SearchPage, SearchParams};

/// Why a single page request failed.
///
/// Every variant is treated as transient by the fetcher.
#[derive(Debug, Clone, Error)]
pub enum PageError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("unexpected status code: {0}")]
    Status(u16),

    #[error("failed to decode page: {0}")]
    Decode(String),
}

/// Source of single result pages.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Source name for logging.
    fn name(&self) -> &str;

    /// Fetch one page for the given parameters.
    async fn fetch_page(
        &self,
        params: &SearchParams,
        request: PageRequest,
    ) -> Result<SearchPage, PageError>;
}

/// Page source backed by the remote HTTP search API.
pub struct HttpPageSource {
    client: Client,
    base_url: String,
}

impl HttpPageSource {
    /// Create a new source with the given configuration.
    pub fn new(config: &SearchConfig) -> Result<Self, PageError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()
            .map_err(|e| PageError::Transport(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }

    /// Build the query string pairs for a page request.
    ///
    /// `limit` and `offset` are owned by the pager and override any value
    /// present in the stored parameters.
    fn query_pairs(params: &SearchParams, request: PageRequest) -> Vec<(String, String)> {
        let mut pairs: Vec<(String, String)> = params
            .iter()
            .filter(|(k, _)| k.as_str() != "limit" && k.as_str() != "offset")
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        pairs.push(("limit".to_string(), request.limit.to_string()));
        if request.offset > 0 {
            pairs.push(("offset".to_string(), request.offset.to_string()));
        }
        pairs
    }
}

#[async_trait]
impl PageSource for HttpPageSource {
    fn name(&self) -> &str {
        "http"
    }

    async fn fetch_page(
        &self,
        params: &SearchParams,
        request: PageRequest,
    ) -> Result<SearchPage, PageError> {
        let pairs = Self::query_pairs(params, request);
        debug!(url = %self.base_url, offset = request.offset, "Requesting search page");

        let response = self
            .client
            .get(&self.base_url)
            .query(&pairs)
            .send()
            .await
            .map_err(|e| PageError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PageError::Status(status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| PageError::Transport(e.to_string()))?;

        let page: ApiPage =
            serde_json::from_slice(&body).map_err(|e| PageError::Decode(e.to_string()))?;

        Ok(page.into())
    }
}

// Search API response types
#[derive(Debug, Deserialize)]
struct ApiPage {
    paging: Paging,
    #[serde(default)]
    results: Vec<ApiHit>,
}

#[derive(Debug, Deserialize)]
struct ApiHit {
    id: String,
    #[serde(default)]
    permalink: Option<String>,
    #[serde(default)]
    thumbnail: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    price: Option<f64>,
}

impl From<ApiPage> for SearchPage {
    fn from(page: ApiPage) -> Self {
        Self {
            paging: page.paging,
            results: page
                .results
                .into_iter()
                .map(|r| SearchHit {
                    id: r.id,
                    permalink: r.permalink.unwrap_or_default(),
                    thumbnail: r.thumbnail.unwrap_or_default(),
                    title: r.title.unwrap_or_default(),
                    price: r.price.unwrap_or(0.0).max(0.0),
                })
                .collect(),
        }
    }
}
