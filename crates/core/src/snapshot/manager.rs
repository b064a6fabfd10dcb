//! Periodic snapshot task.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::metrics;
use crate::state::Registry;

use super::config::SnapshotConfig;
use super::writer::{encode_snapshot, SnapshotWriter};
use super::SnapshotError;

/// Outcome of a successful snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotReport {
    /// Number of queries written.
    pub endpoints: usize,
    /// Size of the written file.
    pub bytes: usize,
    pub duration_ms: u64,
}

/// Persists the registry on a fixed period and once more on shutdown.
pub struct SnapshotManager {
    registry: Arc<Registry>,
    writer: SnapshotWriter,
    config: SnapshotConfig,

    // One snapshot at a time, so an older one never lands after a newer one
    in_progress: Mutex<()>,

    // Runtime state
    running: AtomicBool,
    shutdown_tx: broadcast::Sender<()>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl SnapshotManager {
    pub fn new(registry: Arc<Registry>, writer: SnapshotWriter, config: SnapshotConfig) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            registry,
            writer,
            config,
            in_progress: Mutex::new(()),
            running: AtomicBool::new(false),
            shutdown_tx,
            handle: Mutex::new(None),
        }
    }

    pub fn writer(&self) -> &SnapshotWriter {
        &self.writer
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Take and write a snapshot right away.
    pub async fn snapshot_now(&self) -> Result<SnapshotReport, SnapshotError> {
        let _serial = self.in_progress.lock().await;
        let started = Instant::now();

        let result = self.take_and_write().await;

        let elapsed = started.elapsed();
        metrics::SNAPSHOT_DURATION
            .with_label_values(&[])
            .observe(elapsed.as_secs_f64());

        match result {
            Ok((endpoints, bytes)) => {
                metrics::SNAPSHOTS_TOTAL.with_label_values(&["success"]).inc();
                let report = SnapshotReport {
                    endpoints,
                    bytes,
                    duration_ms: elapsed.as_millis() as u64,
                };
                debug!(
                    path = %self.writer.path().display(),
                    endpoints = report.endpoints,
                    bytes = report.bytes,
                    duration_ms = report.duration_ms,
                    "Snapshot written"
                );
                Ok(report)
            }
            Err(e) => {
                metrics::SNAPSHOTS_TOTAL.with_label_values(&["failed"]).inc();
                Err(e)
            }
        }
    }

    async fn take_and_write(&self) -> Result<(usize, usize), SnapshotError> {
        // Guards are released at the end of this block, before any I/O.
        let (endpoints, bytes) = {
            let views = self.registry.snapshot_views().await;
            (views.len(), encode_snapshot(&views)?)
        };

        let len = bytes.len();
        let writer = self.writer.clone();
        tokio::task::spawn_blocking(move || writer.write(&bytes))
            .await
            .map_err(|e| SnapshotError::Join(e.to_string()))??;

        Ok((endpoints, len))
    }

    /// Spawn the periodic snapshot loop.
    pub async fn start(self: &Arc<Self>) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Snapshot manager already running");
            return;
        }

        {
            let _serial = self.in_progress.lock().await;
            match self.writer.remove_stale() {
                Ok(0) => {}
                Ok(removed) => info!(removed, "Removed leftover snapshot temp files"),
                Err(e) => warn!(error = %e, "Failed to sweep leftover snapshot temp files"),
            }
        }

        let manager = Arc::clone(self);
        let interval = self.config.interval();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        let handle = tokio::spawn(async move {
            info!(
                path = %manager.writer.path().display(),
                interval_secs = interval.as_secs(),
                "Snapshot loop started"
            );
            let first = tokio::time::Instant::now() + interval;
            let mut ticker = tokio::time::interval_at(first, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("Snapshot loop received shutdown signal");
                        break;
                    }
                    _ = ticker.tick() => {
                        if let Err(e) = manager.snapshot_now().await {
                            error!(error = %e, "Snapshot failed, will retry next cycle");
                        }
                    }
                }
            }
        });

        *self.handle.lock().await = Some(handle);
    }

    /// Stop the loop and write one final snapshot.
    pub async fn stop(&self) -> Result<SnapshotReport, SnapshotError> {
        if self.running.swap(false, Ordering::SeqCst) {
            let _ = self.shutdown_tx.send(());
            if let Some(handle) = self.handle.lock().await.take() {
                if let Err(e) = handle.await {
                    warn!(error = %e, "Snapshot task ended abnormally");
                }
            }
        }

        let report = self.snapshot_now().await;
        match &report {
            Ok(r) => info!(endpoints = r.endpoints, bytes = r.bytes, "Final snapshot written"),
            Err(e) => error!(error = %e, "Final snapshot failed"),
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;
    use std::collections::BTreeMap;
    use std::time::Duration;
    use tempfile::TempDir;

    fn registry() -> Arc<Registry> {
        let mut records = BTreeMap::new();
        records.insert(
            "bikes".to_string(),
            fixtures::record(fixtures::params(&[("q", "kona")]), &["A", "B"], &["C"]),
        );
        records.insert(
            "amps".to_string(),
            fixtures::record(fixtures::params(&[("q", "fender")]), &["X"], &[]),
        );
        Arc::new(Registry::from_records(records))
    }

    fn manager(registry: Arc<Registry>, dir: &TempDir) -> Arc<SnapshotManager> {
        Arc::new(SnapshotManager::new(
            registry,
            SnapshotWriter::new(dir.path().join("query.db")),
            SnapshotConfig::default(),
        ))
    }

    #[tokio::test]
    async fn test_snapshot_round_trip() {
        let dir = TempDir::new().unwrap();
        let registry = registry();
        let manager = manager(Arc::clone(&registry), &dir);

        let report = manager.snapshot_now().await.unwrap();
        assert_eq!(report.endpoints, 2);

        let reloaded = Registry::load(manager.writer().path()).unwrap();
        for (before, after) in registry
            .snapshot_views()
            .await
            .iter()
            .zip(reloaded.snapshot_views().await.iter())
        {
            assert_eq!(before.endpoint(), after.endpoint());
            assert_eq!(before.params(), after.params());
            assert_eq!(
                before.available().keys().collect::<Vec<_>>(),
                after.available().keys().collect::<Vec<_>>()
            );
            assert_eq!(
                before.visited().keys().collect::<Vec<_>>(),
                after.visited().keys().collect::<Vec<_>>()
            );
        }
    }

    #[tokio::test]
    async fn test_repersist_is_byte_identical() {
        let dir = TempDir::new().unwrap();
        let first = manager(registry(), &dir);
        first.snapshot_now().await.unwrap();
        let original = std::fs::read(first.writer().path()).unwrap();

        let reloaded = Arc::new(Registry::load(first.writer().path()).unwrap());
        let second_dir = TempDir::new().unwrap();
        let second = manager(reloaded, &second_dir);
        second.snapshot_now().await.unwrap();

        assert_eq!(std::fs::read(second.writer().path()).unwrap(), original);
    }

    #[tokio::test]
    async fn test_snapshot_failure_is_reported() {
        let manager = SnapshotManager::new(
            registry(),
            SnapshotWriter::new("/nonexistent/dir/query.db"),
            SnapshotConfig::default(),
        );
        assert!(manager.snapshot_now().await.is_err());
    }

    #[tokio::test]
    async fn test_stop_writes_final_snapshot() {
        let dir = TempDir::new().unwrap();
        let registry = registry();
        let manager = manager(Arc::clone(&registry), &dir);

        manager.start().await;
        assert!(manager.is_running());
        registry.mark_visited("bikes", "A").await.unwrap();
        manager.stop().await.unwrap();
        assert!(!manager.is_running());

        let reloaded = Registry::load(manager.writer().path()).unwrap();
        let ids: Vec<String> = reloaded
            .list("bikes", None)
            .await
            .unwrap()
            .into_iter()
            .map(|h| h.id)
            .collect();
        assert_eq!(ids, vec!["B"]);
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_first_periodic_snapshot_waits_one_interval() {
        let dir = TempDir::new().unwrap();
        let manager = manager(registry(), &dir);
        let path = manager.writer().path().to_path_buf();

        manager.start().await;
        tokio::time::sleep(Duration::from_secs(599)).await;
        assert!(!path.exists());

        tokio::time::sleep(Duration::from_secs(2)).await;
        for _ in 0..50 {
            if path.exists() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert!(path.exists());

        manager.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_start_sweeps_leftover_temp_files() {
        let dir = TempDir::new().unwrap();
        let manager = manager(registry(), &dir);
        // Left behind by a crash between stage and commit
        let leftover_path = dir.path().join(".query.db.a1b2c3.new");
        std::fs::write(&leftover_path, b"{ half-writ").unwrap();
        let unrelated = dir.path().join("notes.new");
        std::fs::write(&unrelated, b"keep").unwrap();

        manager.start().await;
        assert!(!leftover_path.exists());

        assert!(unrelated.exists());

        manager.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_snapshot_while_mutating_keeps_partition() {
        let dir = TempDir::new().unwrap();
        let registry = Arc::new(Registry::from_records(BTreeMap::from([(
            "bikes".to_string(),
            fixtures::record(fixtures::params(&[]), &[], &[]),
        )])));
        registry
            .get("bikes")
            .unwrap()
            .refresh(fixtures::hits("MLA", 100))
            .await;
        let manager = manager(Arc::clone(&registry), &dir);

        let mutator = {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move {
                for n in 0..100 {
                    registry
                        .mark_visited("bikes", &format!("MLA-{:04}", n))
                        .await
                        .unwrap();
                    tokio::task::yield_now().await;
                }
            })
        };
        for _ in 0..5 {
            manager.snapshot_now().await.unwrap();
            let reloaded = Registry::load(manager.writer().path()).unwrap();
            let summary = &reloaded.summaries().await[0];
            assert_eq!(summary.available + summary.visited, 100);
        }
        mutator.await.unwrap();
    }
}
