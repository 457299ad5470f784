// SPDX-License-Identifier: GPL-3.0-only
mod api;
mod catalog;
mod config;
mod events;
mod installer;
mod inventory;
mod lifecycle;
mod logging;
mod models;
mod sync;
mod utils;
mod version;

#[cfg(test)]
mod test_helpers;

use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::oneshot;
use tracing::{error, info, warn};

use api::{ApiHandlers, HttpServer};
use catalog::{CatalogSource, HttpCatalogClient, SnapshotStore};
use config::Config;
use events::{BroadcastSink, EventSink};
use installer::{ArchiveInstaller, HttpClient, Installer};
use inventory::{Inventory, JsonInventory};
use lifecycle::LifecycleEngine;
use logging::setup_logging;
use sync::{OfflineController, SyncCycle, SyncScheduler, SyncStatusWriter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::load()?;

    // Initialize logging
    setup_logging(&config.log_level, config.log_format)?;

    info!("Starting Flatr store daemon v{}", env!("CARGO_PKG_VERSION"));

    tokio::fs::create_dir_all(&config.state_dir).await?;
    tokio::fs::create_dir_all(&config.install_dir).await?;

    // On-disk state: the inventory is authoritative, the catalog cache is a fallback
    let inventory: Arc<dyn Inventory> = Arc::new(JsonInventory::load(&config.inventory_path()).await?);
    let store = SnapshotStore::new(config.catalog_cache_path());
    let cached = store.load().await;

    let events = BroadcastSink::default();
    let sink: Arc<dyn EventSink> = Arc::new(events.clone());
    let offline = OfflineController::new(SyncStatusWriter::new(cached.fetched_at), Arc::clone(&sink));
    let status = offline.subscribe();

    let installer: Arc<dyn Installer> = Arc::new(ArchiveInstaller::new(
        HttpClient::new()?,
        config.install_dir.clone(),
        config.download_dir(),
        config.allow_local_sources,
    ));
    let engine = LifecycleEngine::new(inventory, installer, sink, status.clone(), cached).await;

    // Background sync
    let source: Arc<dyn CatalogSource> =
        Arc::new(HttpCatalogClient::new(config.catalog_endpoint.clone(), config.fetch_timeout())?);
    let cycle = Arc::new(SyncCycle::new(Arc::clone(&engine), source, store, offline));
    let (scheduler, sync_task) = SyncScheduler::spawn(cycle, config.sync_interval());

    // Local API
    let handlers = Arc::new(ApiHandlers::new(engine, scheduler, status));
    let http_server = HttpServer::new(handlers, events, config.local_api_bind);
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let http_task = tokio::spawn(async move {
        let shutdown = async {
            let _ = shutdown_rx.await;
        };
        if let Err(e) = http_server.serve(shutdown).await {
            error!(error = %e, "HTTP server error");
        }
    });

    info!("All services started. Waiting for shutdown signal...");

    // Wait for shutdown signal
    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Received shutdown signal (Ctrl+C)");
        }
        Err(err) => {
            error!(error = %err, "Unable to listen for shutdown signal");
        }
    }

    info!("Initiating graceful shutdown...");

    // In-flight actions are not cancelled; they are dropped with the runtime.
    sync_task.abort();
    let _ = shutdown_tx.send(());
    if tokio::time::timeout(Duration::from_secs(5), http_task).await.is_err() {
        warn!("HTTP server did not stop in time");
    }

    info!("Shutdown complete");
    Ok(())
}
