//! classcached - Standalone caching daemon for the school administration API
//!
//! Wires the pieces together the way the page process would: restores the
//! persisted cache snapshot, starts the expiry sweep and snapshot timers,
//! spawns the network-boundary worker, and writes a final snapshot on
//! shutdown.

use std::sync::Arc;

use tokio::signal;
use tokio::sync::RwLock;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use classcache::cache::{CacheStore, Snapshot};
use classcache::entity::SharedEntityStore;
use classcache::tasks::{spawn_snapshot_task, spawn_sweep_task};
use classcache::worker::{spawn_worker, HttpFetcher};
use classcache::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing subscriber with env filter
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "classcache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting classcache daemon");

    // Load configuration from environment variables
    let config = Config::from_env();
    info!(
        max_entries = config.max_entries,
        sweep_interval_secs = config.sweep_interval_secs,
        snapshot_interval_secs = config.snapshot_interval_secs,
        data_dir = %config.data_dir.display(),
        base_url = %config.base_url,
        "Configuration loaded"
    );

    // Restore the cache store from the last snapshot, if any
    let snapshot = Snapshot::in_dir(&config.data_dir)?;
    let mut store = CacheStore::new(config.max_entries);
    let restored = snapshot.load();
    if !restored.is_empty() {
        info!(entries = restored.len(), "Restoring cache snapshot");
    }
    store.restore(restored);
    let cache = Arc::new(RwLock::new(store));

    // Open the durable per-entity store
    let entity_store = SharedEntityStore::new(&config.data_dir.join("entities"));
    entity_store.get().await?;
    info!("Entity store initialized");

    // Background maintenance
    let sweep_handle = spawn_sweep_task(cache.clone(), config.sweep_interval_secs);
    let snapshot_handle =
        spawn_snapshot_task(cache.clone(), snapshot.clone(), config.snapshot_interval_secs);

    // Network-boundary worker in its own task
    let fetcher = Arc::new(HttpFetcher::new()?);
    let (_worker_handle, worker_task) = spawn_worker(
        fetcher,
        &config.data_dir.join("worker"),
        config.base_url.clone(),
    )?;
    info!("Network-boundary worker started");

    shutdown_signal().await;

    sweep_handle.abort();
    snapshot_handle.abort();
    worker_task.abort();

    // Final snapshot so restarts pick up where we left off
    {
        let store_guard = cache.read().await;
        if let Err(e) = snapshot.save(&store_guard) {
            warn!(error = %e, "Final snapshot failed");
        } else {
            info!("Final snapshot written");
        }
    }

    info!("Shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
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
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
