//! textdrop - Ephemeral Text Sharing
//!
//! This is the main entry point for the textdrop server.
//! It opens the storage root, reconciles it, starts the reaper and serves HTTP.

use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use textdrop::http::router;
use textdrop::storage::{reconcile, start_reaper, EntryStore, ExpiryIndex, FsStore};
use textdrop::{Config, PasteService};
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command-line arguments and environment
    let config = Config::parse();

    // Set up logging
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "textdrop=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    info!(version = textdrop::VERSION, "Starting textdrop");

    // Open the storage root; this is the one failure we cannot serve through
    let store = FsStore::open(&config.data_dir).with_context(|| {
        format!("cannot open storage root {}", config.data_dir.display())
    })?;
    info!(root = %store.root().display(), "Scanning storage root");

    let store: Arc<dyn EntryStore> = Arc::new(store);
    let index = Arc::new(ExpiryIndex::new());

    // Requests must not be served before the index reflects the disk
    {
        let store = Arc::clone(&store);
        let index = Arc::clone(&index);
        tokio::task::spawn_blocking(move || reconcile(store.as_ref(), &index))
            .await
            .context("reconciliation task failed")?
            .context("startup reconciliation failed")?;
    }

    // Start the background reaper
    let reaper = start_reaper(Arc::clone(&store), Arc::clone(&index), config.reaper_config());

    let service = PasteService::new(store, index).with_id_length(config.id_length());
    let app = router(service, config.static_dir.as_deref());

    if let Some(dir) = &config.static_dir {
        info!(dir = %dir.display(), "Serving static files");
    }

    // Bind the TCP listener
    let listener = TcpListener::bind(config.bind_address())
        .await
        .with_context(|| format!("cannot bind {}", config.bind_address()))?;
    info!("Listening on {}", config.bind_address());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    reaper.stop();
    info!("Server shutdown complete");
    Ok(())
}

/// Resolves once Ctrl+C is received.
async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        error!(error = %e, "Failed to install Ctrl+C handler");
        // Without a handler, keep serving until the process is killed
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received, stopping server...");
}
