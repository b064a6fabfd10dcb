//! Testing utilities and mock implementations.
//!
//! The mocks stand in for the remote search API and for wall-clock sleeping,
//! so fetches, pollers and snapshots can be exercised without a network.
//!
//! # Example
//!
//! ```rust,ignore
//! use listwatch_core::testing::{fixtures, MockPageSource, RecordingSleeper};
//!
//! let source = MockPageSource::new();
//! source.set_catalog(fixtures::hits("MLA", 250)).await;
//! source.set_server_limit(100).await;
//!
//! let sleeper = RecordingSleeper::new();
//! // Hand both to a Fetcher...
//! ```

mod mock_page_source;
mod recording_sleeper;

pub use mock_page_source::{MockPageSource, RecordedPageRequest};
pub use recording_sleeper::RecordingSleeper;

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::search::{SearchHit, SearchParams};
    use crate::state::QueryRecord;

    /// Create a search hit with reasonable defaults and a small thumbnail.
    pub fn hit(id: &str) -> SearchHit {
        SearchHit {
            id: id.to_string(),
            permalink: format!("https://listado.example.com/{}", id),
            thumbnail: format!("https://img.example.com/{}-I.jpg", id),
            title: format!("Listing {}", id),
            price: 1500.0,
        }
    }

    /// Create `count` hits with ids `{prefix}-0000`, `{prefix}-0001`, ...
    pub fn hits(prefix: &str, count: usize) -> Vec<SearchHit> {
        (0..count)
            .map(|i| hit(&format!("{}-{:04}", prefix, i)))
            .collect()
    }

    /// Create one hit per id, in order.
    pub fn hits_with_ids(ids: &[&str]) -> Vec<SearchHit> {
        ids.iter().map(|id| hit(id)).collect()
    }

    /// Build search parameters from key/value pairs.
    pub fn params(pairs: &[(&str, &str)]) -> SearchParams {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    /// Build a persisted query record.
    pub fn record(params: SearchParams, available: &[&str], visited: &[&str]) -> QueryRecord {
        QueryRecord {
            params,
            available: hits_with_ids(available)
                .into_iter()
                .map(|h| (h.id.clone(), h))
                .collect(),
            visited: hits_with_ids(visited)
                .into_iter()
                .map(|h| (h.id.clone(), h))
                .collect(),
        }
    }
}
