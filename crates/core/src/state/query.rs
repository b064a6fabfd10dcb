//! Per-query available/visited partition.

use chrono::{DateTime, Utc};
use serde::ser::{Serialize, SerializeStruct, Serializer};
use serde::Deserialize;
use std::collections::BTreeMap;
use tokio::sync::{RwLock, RwLockReadGuard};

use crate::search::{SearchHit, SearchParams};

/// Persisted form of one query.
#[derive(Debug, Clone, Default, Deserialize, serde::Serialize)]
pub struct QueryRecord {
    #[serde(default, alias = "Params")]
    pub params: SearchParams,
    #[serde(default, alias = "Available")]
    pub available: BTreeMap<String, SearchHit>,
    #[serde(default, alias = "Visited")]
    pub visited: BTreeMap<String, SearchHit>,
}

/// Outcome of a refresh.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshStats {
    /// Hits returned by the fetch (after collapsing duplicate ids).
    pub fetched: usize,
    /// Hits now available.
    pub available: usize,
    /// Fetched hits skipped because they were already visited.
    pub excluded: usize,
    /// Previously available hits that the fetch no longer returned.
    pub dropped: usize,
}

/// Point-in-time counters for one query.
#[derive(Debug, Clone)]
pub struct QuerySummary {
    pub endpoint: String,
    pub available: usize,
    pub visited: usize,
    pub last_refresh: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct Partition {
    available: BTreeMap<String, SearchHit>,
    visited: BTreeMap<String, SearchHit>,
    last_refresh: Option<DateTime<Utc>>,
}

impl Partition {
    fn mark_visited(&mut self, id: &str) -> bool {
        match self.available.remove(id) {
            Some(hit) => {
                self.visited.insert(id.to_string(), hit);
                true
            }
            None => false,
        }
    }
}

/// One named query with concurrent access to its partition.
///
/// `available` and `visited` never share an id. Mutations take the write
/// lock; `list` and `snapshot_view` share the read lock.
#[derive(Debug)]
pub struct QueryState {
    endpoint: String,
    params: SearchParams,
    partition: RwLock<Partition>,
}

impl QueryState {
    /// Create an empty query.
    pub fn new(endpoint: impl Into<String>, params: SearchParams) -> Self {
        Self::from_record(endpoint, QueryRecord {
            params,
            ..Default::default()
        })
    }

    /// Rebuild a query from its persisted form.
    ///
    /// An id present in both maps is kept only as visited.
    pub fn from_record(endpoint: impl Into<String>, record: QueryRecord) -> Self {
        let QueryRecord {
            params,
            mut available,
            visited,
        } = record;
        available.retain(|id, _| !visited.contains_key(id));

        Self {
            endpoint: endpoint.into(),
            params,
            partition: RwLock::new(Partition {
                available,
                visited,
                last_refresh: None,
            }),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn params(&self) -> &SearchParams {
        &self.params
    }

    /// Replace the available set with the fetched hits that were never visited.
    pub async fn refresh(&self, fetched: Vec<SearchHit>) -> RefreshStats {
        let mut partition = self.partition.write().await;

        let mut next = BTreeMap::new();
        let mut excluded = 0;
        for hit in fetched {
            if partition.visited.contains_key(&hit.id) {
                excluded += 1;
                continue;
            }
            next.insert(hit.id.clone(), hit);
        }

        let dropped = partition
            .available
            .keys()
            .filter(|id| !next.contains_key(*id))
            .count();

        let stats = RefreshStats {
            fetched: next.len() + excluded,
            available: next.len(),
            excluded,
            dropped,
        };
        partition.available = next;
        partition.last_refresh = Some(Utc::now());
        stats
    }

    /// Copy of up to `limit` available hits, in id order.
    pub async fn list(&self, limit: Option<usize>) -> Vec<SearchHit> {
        let partition = self.partition.read().await;
        partition
            .available
            .values()
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect()
    }

    /// Move `id` from available to visited. Returns whether anything moved.
    pub async fn mark_visited(&self, id: &str) -> bool {
        self.partition.write().await.mark_visited(id)
    }

    /// Mark every id under a single write lock. Returns how many moved.
    pub async fn mark_visited_batch<S: AsRef<str>>(&self, ids: &[S]) -> usize {
        let mut partition = self.partition.write().await;
        ids.iter()
            .filter(|id| partition.mark_visited(id.as_ref()))
            .count()
    }

    /// Current counters.
    pub async fn summary(&self) -> QuerySummary {
        let partition = self.partition.read().await;
        QuerySummary {
            endpoint: self.endpoint.clone(),
            available: partition.available.len(),
            visited: partition.visited.len(),
            last_refresh: partition.last_refresh,
        }
    }

    /// Hold the read lock and expose the whole query for serialization.
    ///
    /// The lock is released when the view is dropped.
    pub async fn snapshot_view(&self) -> QueryView<'_> {
        QueryView {
            endpoint: &self.endpoint,
            params: &self.params,
            partition: self.partition.read().await,
        }
    }
}

/// Read-only view of a query, valid while the shared lock is held.
pub struct QueryView<'a> {
    endpoint: &'a str,
    params: &'a SearchParams,
    partition: RwLockReadGuard<'a, Partition>,
}

impl QueryView<'_> {
    pub fn endpoint(&self) -> &str {
        self.endpoint
    }

    pub fn params(&self) -> &SearchParams {
        self.params
    }

    pub fn available(&self) -> &BTreeMap<String, SearchHit> {
        &self.partition.available
    }

    pub fn visited(&self) -> &BTreeMap<String, SearchHit> {
        &self.partition.visited
    }

    /// Owned copy of the persisted form.
    pub fn to_record(&self) -> QueryRecord {
        QueryRecord {
            params: self.params.clone(),
            available: self.partition.available.clone(),
            visited: self.partition.visited.clone(),
        }
    }
}

impl Serialize for QueryView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("QueryRecord", 3)?;
        state.serialize_field("params", self.params)?;
        state.serialize_field("available", &self.partition.available)?;
        state.serialize_field("visited", &self.partition.visited)?;
        state.end()
    }
}
