//! Mock page source for testing.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::search::{PageError, PageRequest, PageSource, Paging, SearchHit, SearchPage, SearchParams};

/// A recorded page request for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedPageRequest {
    /// Parameters the request was made with.
    pub params: SearchParams,
    /// Requested offset and limit.
    pub request: PageRequest,
}

/// Mock implementation of the PageSource trait.
///
/// Serves pages out of an in-memory catalog the way the remote API does:
/// the requested limit is clamped to a server-side maximum and the paging
/// block echoes the effective offset and limit. Failures can be scripted
/// ahead of time.
///
/// # Example
///
/// ```rust,ignore
/// use listwatch_core::testing::{fixtures, MockPageSource};
///
/// let source = MockPageSource::new();
/// source.set_catalog(fixtures::hits("MLA", 250)).await;
/// source.set_server_limit(100).await;
/// source.fail_next(PageError::Status(503)).await;
/// ```
pub struct MockPageSource {
    /// Everything the "server" knows about.
    catalog: Arc<RwLock<Vec<SearchHit>>>,
    /// Largest page the "server" hands out.
    server_limit: Arc<RwLock<u64>>,
    /// Errors returned by the next requests, in order.
    failures: Arc<RwLock<VecDeque<PageError>>>,
    /// One-shot errors returned the first time an offset is requested.
    offset_failures: Arc<RwLock<Vec<(u64, PageError)>>>,
    /// Artificial latency per request.
    latency: Arc<RwLock<Option<Duration>>>,
    /// Recorded requests.
    requests: Arc<RwLock<Vec<RecordedPageRequest>>>,
}

impl std::fmt::Debug for MockPageSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockPageSource")
            .field("catalog", &"<catalog>")
            .field("requests", &"<requests>")
            .finish()
    }
}

impl Default for MockPageSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPageSource {
    /// Create a mock source with an empty catalog.
    pub fn new() -> Self {
        Self {
            catalog: Arc::new(RwLock::new(Vec::new())),
            server_limit: Arc::new(RwLock::new(u64::MAX)),
            failures: Arc::new(RwLock::new(VecDeque::new())),
            offset_failures: Arc::new(RwLock::new(Vec::new())),
            latency: Arc::new(RwLock::new(None)),
            requests: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Replace the catalog served by subsequent requests.
    pub async fn set_catalog(&self, hits: Vec<SearchHit>) {
        *self.catalog.write().await = hits;
    }

    /// Clamp every page to at most `limit` results.
    pub async fn set_server_limit(&self, limit: u64) {
        *self.server_limit.write().await = limit;
    }

    /// Queue an error for the next request.
    pub async fn fail_next(&self, error: PageError) {
        self.failures.write().await.push_back(error);
    }

    /// Fail the first request for `offset` with `error`.
    pub async fn fail_at_offset(&self, offset: u64, error: PageError) {
        self.offset_failures.write().await.push((offset, error));
    }

    /// Delay every response by `latency`.
    pub async fn set_latency(&self, latency: Duration) {
        *self.latency.write().await = Some(latency);
    }

    /// Get recorded requests.
    pub async fn recorded_requests(&self) -> Vec<RecordedPageRequest> {
        self.requests.read().await.clone()
    }

    /// Get the number of requests made.
    pub async fn request_count(&self) -> usize {
        self.requests.read().await.len()
    }

    async fn take_failure(&self, offset: u64) -> Option<PageError> {
        if let Some(err) = self.failures.write().await.pop_front() {
            return Some(err);
        }
        let mut by_offset = self.offset_failures.write().await;
        let idx = by_offset.iter().position(|(o, _)| *o == offset)?;
        Some(by_offset.remove(idx).1)
    }
}

#[async_trait]
impl PageSource for MockPageSource {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch_page(
        &self,
        params: &SearchParams,
        request: PageRequest,
    ) -> Result<SearchPage, PageError> {
        self.requests.write().await.push(RecordedPageRequest {
            params: params.clone(),
            request,
        });

        let latency = *self.latency.read().await;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        if let Some(err) = self.take_failure(request.offset).await {
            return Err(err);
        }

        let catalog = self.catalog.read().await;
        let limit = request.limit.min(*self.server_limit.read().await);
        let total = catalog.len() as u64;
        let start = request.offset.min(total) as usize;
        let end = request.offset.saturating_add(limit).min(total) as usize;

        Ok(SearchPage {
            paging: Paging {
                total,
                offset: request.offset,
                limit,
            },
            results: catalog[start..end].to_vec(),
        })
    }
}
