//! Snapshot configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the periodic snapshot task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotConfig {
    /// Seconds between the starts of consecutive snapshots.
    #[serde(default = "default_interval")]
    pub interval_secs: u64,
}

fn default_interval() -> u64 {
    600 // 10 minutes
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval(),
        }
    }
}

impl SnapshotConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}
