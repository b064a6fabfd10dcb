//! Paginated search against the remote listings API.
//!
//! A `PageSource` returns one page at a time; the `Fetcher` walks every page
//! of a query, retrying failed pages with exponential backoff.

mod config;
mod fetcher;
mod retry;
mod source;
mod types;

pub use config::{RetryConfig, SearchConfig};
pub use fetcher::{FetchError, Fetcher};
pub use retry::{RetryPolicy, Sleeper, TokioSleeper};
pub use source::{HttpPageSource, PageError, PageSource};
pub use types::*;
