//! Application setup and initialization

pub mod database;
pub mod routes;
pub mod server;
pub mod services;
pub mod storage;

use crate::state::AppState;
use anyhow::{Context, Result};
use birdtag_core::Config;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Long-running tasks started next to the HTTP server
pub struct BackgroundTasks {
    pub notification_worker: JoinHandle<()>,
    pub transient_cleanup: JoinHandle<()>,
}

impl BackgroundTasks {
    pub fn shutdown(self) {
        self.transient_cleanup.abort();
        // The worker exits on its own once the last ChangeFeed is dropped; anything
        // still queued at shutdown is dropped with it.
        self.notification_worker.abort();
        tracing::info!("Background tasks stopped");
    }
}

pub struct App {
    pub state: Arc<AppState>,
    pub router: axum::Router,
    pub background: BackgroundTasks,
}

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<App> {
    // Validate configuration first - fail fast on misconfiguration
    config.validate().context("Configuration validation failed")?;

    crate::telemetry::init_telemetry(config.is_production());

    tracing::info!(
        environment = %config.environment(),
        metadata_backend = %config.metadata_backend(),
        storage_backend = %config.storage_backend(),
        messaging_backend = %config.messaging_backend(),
        "Configuration loaded and validated successfully"
    );

    let pool = database::setup_database(&config).await?;

    let storage = storage::setup_storage(&config).await?;

    let (state, background) = services::initialize_services(&config, pool, storage).await?;

    let router = routes::setup_routes(&config, state.clone())?;

    Ok(App {
        state,
        router,
        background,
    })
}
