//! Poller tasks.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::metrics;
use crate::search::{FetchError, Fetcher};
use crate::state::{QueryState, RefreshStats, Registry};

use super::config::PollerConfig;

/// Fetch one query and merge the result into its state.
///
/// On failure the state is left untouched.
pub async fn poll_once(query: &QueryState, fetcher: &Fetcher) -> Result<RefreshStats, FetchError> {
    debug!(endpoint = %query.endpoint(), "Polling");

    let hits = match fetcher.fetch(query.params()).await {
        Ok(hits) => hits,
        Err(e) => {
            error!(endpoint = %query.endpoint(), error = %e, "Fetch failed, keeping previous results");
            metrics::POLLS_TOTAL.with_label_values(&["failed"]).inc();
            return Err(e);
        }
    };

    let stats = query.refresh(hits).await;
    metrics::POLLS_TOTAL.with_label_values(&["refreshed"]).inc();
    info!(
        endpoint = %query.endpoint(),
        fetched = stats.fetched,
        available = stats.available,
        excluded = stats.excluded,
        dropped = stats.dropped,
        "Refreshed"
    );
    Ok(stats)
}

/// Runs one recurring poll task per registered query.
pub struct Poller {
    registry: Arc<Registry>,
    fetcher: Arc<Fetcher>,
    config: PollerConfig,

    // Runtime state
    running: AtomicBool,
    shutdown_tx: broadcast::Sender<()>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Poller {
    pub fn new(registry: Arc<Registry>, fetcher: Arc<Fetcher>, config: PollerConfig) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            registry,
            fetcher,
            config,
            running: AtomicBool::new(false),
            shutdown_tx,
            handles: Mutex::new(Vec::new()),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Spawn the poll tasks. The first poll of every query starts immediately.
    pub async fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Poller already running");
            return;
        }

        let mut handles = self.handles.lock().await;
        for query in self.registry.iter() {
            handles.push(self.spawn_poll_loop(Arc::clone(query)));
        }

        info!(
            queries = handles.len(),
            interval_secs = self.config.interval_secs,
            "Pollers started"
        );
    }

    /// Signal every poll task and wait for them to exit.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            warn!("Poller not running");
            return;
        }

        info!("Stopping pollers");
        let _ = self.shutdown_tx.send(());

        let handles: Vec<_> = self.handles.lock().await.drain(..).collect();
        for result in join_all(handles).await {
            if let Err(e) = result {
                warn!(error = %e, "Poll task ended abnormally");
            }
        }

        info!("Pollers stopped");
    }

    fn spawn_poll_loop(&self, query: Arc<QueryState>) -> JoinHandle<()> {
        let fetcher = Arc::clone(&self.fetcher);
        let interval = self.config.interval();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            debug!(endpoint = %query.endpoint(), "Poll loop started");
            // First tick fires immediately; later ticks are spaced start to start
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => break,
                    _ = ticker.tick() => {}
                }

                tokio::select! {
                    _ = shutdown_rx.recv() => break,
                    // Errors are logged and counted inside poll_once
                    _ = poll_once(&query, &fetcher) => {}
                }
            }
            debug!(endpoint = %query.endpoint(), "Poll loop exited");
        })
    }
}
