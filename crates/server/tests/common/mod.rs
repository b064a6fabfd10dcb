//! Common test utilities for in-process API testing.
//!
//! This module provides a test fixture that builds the router over a seeded
//! registry and a snapshot manager writing into a temp directory, so every
//! route can be exercised without a network or a running binary.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use listwatch_core::{
    Config, ListingConfig, QueryRecord, Registry, SnapshotConfig, SnapshotManager,
    SnapshotWriter,
};

/// Re-export fixtures for test convenience
pub use listwatch_core::testing::fixtures;

/// Test fixture for API testing.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_mark_visited() {
///     let fixture = TestFixture::new().await;
///
///     let response = fixture.post("/api/v1/endpoints/bikes/visited", json!({
///         "id": "MLA-0000"
///     })).await;
///
///     assert_eq!(response.status, 200);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// The registry behind the router
    pub registry: Arc<Registry>,
    /// Where snapshots are written
    pub state_path: PathBuf,
    /// Temporary directory holding the state file
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

/// Configuration for test fixture.
#[derive(Debug, Clone)]
pub struct TestConfig {
    /// Queries to seed, by endpoint
    pub records: BTreeMap<String, QueryRecord>,
    /// Listing cap
    pub max_results: usize,
}

impl Default for TestConfig {
    /// Two queries: `bikes` with five available hits and one visited,
    /// `amps` with nothing yet.
    fn default() -> Self {
        let mut records = BTreeMap::new();
        let mut bikes = fixtures::record(fixtures::params(&[("q", "kona")]), &[], &["SOLD-1"]);
        for hit in fixtures::hits("MLA", 5) {
            bikes.available.insert(hit.id.clone(), hit);
        }
        records.insert("bikes".to_string(), bikes);
        records.insert(
            "amps".to_string(),
            fixtures::record(fixtures::params(&[("q", "fender")]), &[], &[]),
        );
        Self {
            records,
            max_results: 100,
        }
    }
}

impl TestFixture {
    /// Create a new test fixture with the default queries.
    pub async fn new() -> Self {
        Self::with_config(TestConfig::default()).await
    }

    /// Create a test fixture with custom configuration.
    pub async fn with_config(test_config: TestConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let state_path = temp_dir.path().join("query.db");

        let config = Config {
            listing: ListingConfig {
                max_results: test_config.max_results,
            },
            ..Default::default()
        };

        let registry = Arc::new(Registry::from_records(test_config.records));
        let snapshots = Arc::new(SnapshotManager::new(
            Arc::clone(&registry),
            SnapshotWriter::new(&state_path),
            SnapshotConfig::default(),
        ));

        let state = Arc::new(listwatch_server::state::AppState::new(
            config,
            Arc::clone(&registry),
            snapshots,
        ));

        // Create router
        let router = listwatch_server::api::create_router(state);

        Self {
            router,
            registry,
            state_path,
            temp_dir,
        }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a POST request without a body.
    pub async fn post_empty(&self, path: &str) -> TestResponse {
        self.request("POST", path, None).await
    }

    /// Send a POST request with raw string body (for testing malformed JSON).
    pub async fn post_raw(&self, path: &str, body: &str) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let (status, bytes) = self.send(request).await;
        TestResponse {
            status,
            body: parse_body(&bytes),
        }
    }

    /// GET a non-JSON resource and return the body as text.
    pub async fn get_text(&self, path: &str) -> (StatusCode, String) {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();
        let (status, bytes) = self.send(request).await;
        (status, String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        let request = request_builder.body(body).unwrap();
        let (status, bytes) = self.send(request).await;

        TestResponse {
            status,
            body: parse_body(&bytes),
        }
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        (status, body_bytes.to_vec())
    }
}

fn parse_body(bytes: &[u8]) -> Value {
    if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(bytes).unwrap_or(Value::Null)
    }
}
