//! The fixed set of queries, keyed by endpoint name.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use super::query::{QueryRecord, QuerySummary, QueryState, QueryView};
use super::StateError;
use crate::search::SearchHit;

/// Every configured query.
///
/// Built once at startup and never changes structurally afterwards, so it
/// needs no lock of its own. Each query carries its own lock.
#[derive(Debug, Default)]
pub struct Registry {
    queries: BTreeMap<String, Arc<QueryState>>,
}

impl Registry {
    /// Build a registry from persisted records.
    pub fn from_records(records: BTreeMap<String, QueryRecord>) -> Self {
        let queries = records
            .into_iter()
            .map(|(endpoint, record)| {
                let state = QueryState::from_record(endpoint.clone(), record);
                (endpoint, Arc::new(state))
            })
            .collect();
        Self { queries }
    }

    /// Parse the persisted JSON document.
    pub fn from_json(json: &str) -> Result<Self, StateError> {
        let records: BTreeMap<String, QueryRecord> = serde_json::from_str(json)?;
        Ok(Self::from_records(records))
    }

    /// Load the persisted state file.
    pub fn load(path: &Path) -> Result<Self, StateError> {
        if !path.exists() {
            return Err(StateError::NotFound(path.to_path_buf()));
        }
        let json = std::fs::read_to_string(path).map_err(|source| StateError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let registry = Self::from_json(&json)?;
        info!(
            path = %path.display(),
            queries = registry.len(),
            "Loaded query state"
        );
        Ok(registry)
    }

    /// Look up a query by endpoint.
    pub fn get(&self, endpoint: &str) -> Result<&Arc<QueryState>, StateError> {
        self.queries
            .get(endpoint)
            .ok_or_else(|| StateError::UnknownEndpoint(endpoint.to_string()))
    }

    /// Endpoint names in ascending order.
    pub fn endpoints(&self) -> impl Iterator<Item = &str> {
        self.queries.keys().map(String::as_str)
    }

    /// Queries in ascending endpoint order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<QueryState>> {
        self.queries.values()
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    pub async fn list(
        &self,
        endpoint: &str,
        limit: Option<usize>,
    ) -> Result<Vec<SearchHit>, StateError> {
        Ok(self.get(endpoint)?.list(limit).await)
    }

    pub async fn mark_visited(&self, endpoint: &str, id: &str) -> Result<bool, StateError> {
        Ok(self.get(endpoint)?.mark_visited(id).await)
    }

    pub async fn mark_visited_batch<S: AsRef<str>>(
        &self,
        endpoint: &str,
        ids: &[S],
    ) -> Result<usize, StateError> {
        Ok(self.get(endpoint)?.mark_visited_batch(ids).await)
    }

    /// Counters for every query, in endpoint order.
    pub async fn summaries(&self) -> Vec<QuerySummary> {
        let mut out = Vec::with_capacity(self.queries.len());
        for query in self.queries.values() {
            out.push(query.summary().await);
        }
        out
    }

    /// Read-lock every query in ascending endpoint order.
    ///
    /// All guards are held until the returned views are dropped, so the
    /// views together form one consistent point-in-time state. Any other
    /// operation that needs more than one query lock must use the same order.
    pub async fn snapshot_views(&self) -> Vec<QueryView<'_>> {
        let mut views = Vec::with_capacity(self.queries.len());
        for query in self.queries.values() {
            views.push(query.snapshot_view().await);
        }
        views
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn registry() -> Registry {
        let mut records = BTreeMap::new();
        records.insert(
            "bikes".to_string(),
            fixtures::record(fixtures::params(&[("q", "kona")]), &["A", "B"], &["C"]),
        );
        records.insert(
            "amps".to_string(),
            fixtures::record(fixtures::params(&[("q", "fender")]), &["X"], &[]),
        );
        Registry::from_records(records)
    }

    #[test]
    fn test_endpoints_are_sorted() {
        let registry = registry();
        let endpoints: Vec<&str> = registry.endpoints().collect();
        assert_eq!(endpoints, vec!["amps", "bikes"]);
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_endpoint() {
        let registry = registry();

        let err = registry.list("boats", None).await.unwrap_err();
        assert!(matches!(err, StateError::UnknownEndpoint(ref e) if e == "boats"));
        assert!(registry.mark_visited("boats", "A").await.is_err());
        assert!(registry
            .mark_visited_batch("boats", &["A"])
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_mutation_surface() {
        let registry = registry();

        assert!(registry.mark_visited("bikes", "A").await.unwrap());
        assert!(!registry.mark_visited("bikes", "A").await.unwrap());
        assert_eq!(
            registry
                .mark_visited_batch("bikes", &["B", "C", "Z"])
                .await
                .unwrap(),
            1
        );
        assert!(registry.list("bikes", None).await.unwrap().is_empty());
        // Other queries are untouched
        assert_eq!(registry.list("amps", None).await.unwrap().len(), 1);
    }

    #[test]
    fn test_from_json_defaults_missing_maps() {
        let registry = Registry::from_json(r#"{"bikes": {"params": {"q": "kona"}}}"#).unwrap();
        let query = registry.get("bikes").unwrap();
        assert_eq!(query.params().get("q").map(String::as_str), Some("kona"));
    }

    #[tokio::test]
    async fn test_from_json_accepts_legacy_keys() {
        let json = r#"{
            "bikes": {
                "Endpoint": "bikes",
                "Params": {"q": "kona"},
                "Available": {
                    "MLA1": {"Id": "MLA1", "Permalink": "p", "Thumbnail": "t", "Title": "Kona", "Price": 1200}
                },
                "Visited": {}
            }
        }"#;

        let registry = Registry::from_json(json).unwrap();
        let hits = registry.list("bikes", None).await.unwrap();

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Kona");
        assert_eq!(hits[0].price, 1200.0);
    }

    #[test]
    fn test_from_json_invalid() {
        let err = Registry::from_json("{not json").unwrap_err();
        assert!(matches!(err, StateError::Parse(_)));
    }

    #[test]
    fn test_load_missing_file() {
        let err = Registry::load(Path::new("/nonexistent/query.db")).unwrap_err();
        assert!(matches!(err, StateError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"bikes": {{"params": {{}}, "available": {{"A": {{"id": "A"}}}}, "visited": {{}}}}}}"#
        )
        .unwrap();

        let registry = Registry::load(file.path()).unwrap();
        assert_eq!(registry.list("bikes", None).await.unwrap()[0].id, "A");
    }

    #[tokio::test]
    async fn test_snapshot_views_in_endpoint_order() {
        let registry = registry();
        let views = registry.snapshot_views().await;
        let endpoints: Vec<&str> = views.iter().map(|v| v.endpoint()).collect();
        assert_eq!(endpoints, vec!["amps", "bikes"]);
    }

    #[tokio::test]
    async fn test_summaries() {
        let registry = registry();
        let summaries = registry.summaries().await;
        assert_eq!(summaries[1].endpoint, "bikes");
        assert_eq!(summaries[1].available, 2);
        assert_eq!(summaries[1].visited, 1);
    }
}
