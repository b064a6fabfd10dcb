//! Paginated fetch with retry.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::metrics;

use super::config::SearchConfig;
use super::retry::{RetryPolicy, Sleeper, TokioSleeper};
use super::source::{PageError, PageSource};
use super::types::{PageRequest, SearchHit, SearchPage, SearchParams};

/// Errors that end a fetch.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("page at offset {offset} failed after {attempts} attempts: {last}")]
    RetriesExhausted {
        offset: u64,
        attempts: u32,
        #[source]
        last: PageError,
    },
}

/// Retrieves the complete result set of a query, page by page.
///
/// Page requests that fail (transport errors, non-success status, undecodable
/// bodies) are retried on the same offset according to the retry policy. The
/// fetcher never holds any query lock.
pub struct Fetcher {
    source: Arc<dyn PageSource>,
    sleeper: Arc<dyn Sleeper>,
    retry: RetryPolicy,
    page_size: u64,
    page_delay: Duration,
}

impl Fetcher {
    /// Create a fetcher over `source` using the configured paging and retry settings.
    pub fn new(source: Arc<dyn PageSource>, config: &SearchConfig) -> Self {
        Self {
            source,
            sleeper: Arc::new(TokioSleeper),
            retry: RetryPolicy::from_config(&config.retry),
            page_size: config.page_size,
            page_delay: Duration::from_millis(config.page_delay_ms),
        }
    }

    /// Replace the sleeper (tests use a recording fake).
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Replace the retry policy.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Fetch every page for `params` and return the combined hits in page order.
    pub async fn fetch(&self, params: &SearchParams) -> Result<Vec<SearchHit>, FetchError> {
        let mut hits = Vec::new();
        let mut request = PageRequest {
            offset: 0,
            limit: self.page_size,
        };

        loop {
            let page = self.fetch_page_with_retry(params, request).await?;
            metrics::PAGES_FETCHED.inc();

            let paging = page.paging;
            hits.extend(page.results.into_iter().map(SearchHit::with_large_thumbnail));

            let Some(next) = paging.next_offset() else {
                break;
            };
            if next <= request.offset {
                // The server ignored the requested offset; asking again would never end
                warn!(
                    source = self.source.name(),
                    requested = request.offset,
                    echoed = paging.offset,
                    "Page offset did not advance, stopping pagination"
                );
                break;
            }

            debug!(offset = next, total = paging.total, "Fetching next page");
            self.sleeper.sleep(self.page_delay).await;
            request.offset = next;
        }

        metrics::HITS_PER_FETCH
            .with_label_values(&[])
            .observe(hits.len() as f64);
        Ok(hits)
    }

    /// Request one page, retrying until it succeeds or the policy runs out.
    async fn fetch_page_with_retry(
        &self,
        params: &SearchParams,
        request: PageRequest,
    ) -> Result<SearchPage, FetchError> {
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            let error = match self.source.fetch_page(params, request).await {
                Ok(page) => return Ok(page),
                Err(e) => e,
            };

            if self.retry.is_exhausted(attempts) {
                metrics::FETCH_EXHAUSTED.inc();
                warn!(
                    source = self.source.name(),
                    offset = request.offset,
                    attempts,
                    error = %error,
                    "Giving up on page"
                );
                return Err(FetchError::RetriesExhausted {
                    offset: request.offset,
                    attempts,
                    last: error,
                });
            }

            let delay = self.retry.delay_for(attempts - 1);
            warn!(
                source = self.source.name(),
                offset = request.offset,
                attempt = attempts,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Page request failed, retrying"
            );
            metrics::FETCH_RETRIES
                .with_label_values(&[retry_reason(&error)])
                .inc();
            self.sleeper.sleep(delay).await;
        }
    }
}

fn retry_reason(error: &PageError) -> &'static str {
    match error {
        PageError::Transport(_) => "transport",
        PageError::Status(_) => "status",
        PageError::Decode(_) => "decode",
    }
}
