use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use listwatch_core::{
    load_config, validate_config, Fetcher, HttpPageSource, PageSource, Poller, Registry,
    SnapshotManager, SnapshotWriter,
};
use listwatch_server::api::create_router;
use listwatch_server::state::AppState;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("LISTWATCH_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("State path: {:?}", config.state.path);
    info!("Search API: {}", config.search.base_url);

    // Load persisted queries; without them there is nothing to watch
    let registry = Arc::new(
        Registry::load(&config.state.path)
            .with_context(|| format!("Failed to load state from {:?}", config.state.path))?,
    );
    info!("Watching {} queries", registry.len());

    // Create fetcher
    let source: Arc<dyn PageSource> = Arc::new(
        HttpPageSource::new(&config.search).context("Failed to create search client")?,
    );
    let fetcher = Arc::new(Fetcher::new(source, &config.search));

    // Start pollers
    let poller = Poller::new(
        Arc::clone(&registry),
        Arc::clone(&fetcher),
        config.poller.clone(),
    );
    poller.start().await;

    // Start snapshot manager
    let snapshots = Arc::new(SnapshotManager::new(
        Arc::clone(&registry),
        SnapshotWriter::new(&config.state.path),
        config.snapshot.clone(),
    ));
    snapshots.start().await;

    // Create app state
    let state = Arc::new(AppState::new(
        config.clone(),
        Arc::clone(&registry),
        Arc::clone(&snapshots),
    ));

    // Create router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error");

    // Stop background tasks even if the server failed
    info!("Server shutting down...");
    poller.stop().await;
    if let Err(e) = snapshots.stop().await {
        error!("Final snapshot failed: {}", e);
    }

    served
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
