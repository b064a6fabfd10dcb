//! Types for the paginated search API.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

/// Search parameters sent verbatim to the remote API.
///
/// Kept ordered so requests and persisted snapshots are deterministic.
pub type SearchParams = BTreeMap<String, String>;

/// Thumbnail size code returned by the search API.
const SMALL_THUMBNAIL_SUFFIX: &str = "-I.jpg";
/// Larger variant served at the same path.
const LARGE_THUMBNAIL_SUFFIX: &str = "-U.jpg";

/// One remote search hit.
///
/// Identity is the `id` alone: two hits with the same id are the same
/// listing even if price or title changed between fetches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    #[serde(alias = "Id")]
    pub id: String,
    #[serde(default, alias = "Permalink")]
    pub permalink: String,
    #[serde(default, alias = "Thumbnail")]
    pub thumbnail: String,
    #[serde(default, alias = "Title")]
    pub title: String,
    #[serde(default, alias = "Price")]
    pub price: f64,
}

impl SearchHit {
    /// Rewrite the thumbnail URL to point at the larger image variant.
    pub fn with_large_thumbnail(mut self) -> Self {
        self.thumbnail = upgrade_thumbnail(&self.thumbnail);
        self
    }
}

impl PartialEq for SearchHit {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for SearchHit {}

impl Hash for SearchHit {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Replace every small size code in a thumbnail URL with the large one.
pub fn upgrade_thumbnail(url: &str) -> String {
    url.replace(SMALL_THUMBNAIL_SUFFIX, LARGE_THUMBNAIL_SUFFIX)
}

/// Paging block of a search response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paging {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub offset: u64,
    #[serde(default)]
    pub limit: u64,
}

impl Paging {
    /// Offset of the page after this one, if there is one.
    pub fn next_offset(&self) -> Option<u64> {
        if self.limit == 0 {
            return None;
        }
        let next = self.offset.saturating_add(self.limit);
        (next < self.total).then_some(next)
    }
}

/// A single decoded page of results.
#[derive(Debug, Clone, Default)]
pub struct SearchPage {
    pub paging: Paging,
    pub results: Vec<SearchHit>,
}

/// Which page to request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub offset: u64,
    pub limit: u64,
}
