//! Poller configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the per-query pollers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollerConfig {
    /// Seconds between the starts of consecutive polls.
    /// The first poll runs immediately at startup.
    #[serde(default = "default_interval")]
    pub interval_secs: u64,
}

fn default_interval() -> u64 {
    1500 // 25 minutes
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval(),
        }
    }
}

impl PollerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}
