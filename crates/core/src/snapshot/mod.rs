//! Consistent point-in-time persistence of the whole registry.
//!
//! Every query is read-locked in endpoint order, the locked views are
//! serialized together, and the bytes replace the state file atomically.

mod config;
mod manager;
mod writer;

pub use config::SnapshotConfig;
pub use manager::{SnapshotManager, SnapshotReport};
pub use writer::{encode_snapshot, SnapshotWriter, StagedSnapshot};

use thiserror::Error;

/// Errors from taking or writing a snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("failed to encode snapshot: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("failed to write snapshot: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot task failed: {0}")]
    Join(String),
}
