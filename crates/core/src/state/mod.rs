//! Dedup state: per-query available/visited partitions and the registry
//! holding them.

mod query;
mod registry;

pub use query::{QueryRecord, QuerySummary, QueryState, QueryView, RefreshStats};
pub use registry::Registry;

use std::path::PathBuf;
use thiserror::Error;

/// Errors from state lookups and loading.
#[derive(Debug, Error)]
pub enum StateError {
    /// No query is registered under this endpoint.
    #[error("unknown endpoint: {0}")]
    UnknownEndpoint(String),

    #[error("state file not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to read state file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse state: {0}")]
    Parse(#[from] serde_json::Error),
}
