use std::sync::Arc;
use listwatch_core::{Config, Registry, SnapshotManager};

/// Shared application state
pub struct AppState {
    config: Config,
    registry: Arc<Registry>,
    snapshots: Arc<SnapshotManager>,
}

impl AppState {
    pub fn new(config: Config, registry: Arc<Registry>, snapshots: Arc<SnapshotManager>) -> Self {
        Self {
            config,
            registry,
            snapshots,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn snapshots(&self) -> &SnapshotManager {
        &self.snapshots
    }
}
