//! Database setup and initialization

use anyhow::{Context, Result};
use birdtag_core::{Config, MetadataBackend};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::path::Path;
use std::time::Duration;

/// Connect and migrate when the PostgreSQL metadata backend is selected
pub async fn setup_database(config: &Config) -> Result<Option<PgPool>> {
    if config.metadata_backend() != MetadataBackend::Postgres {
        tracing::info!("In-memory metadata backend selected, skipping database setup");
        return Ok(None);
    }

    let database_url = config
        .database_url()
        .context("DATABASE_URL is required for the postgres metadata backend")?;

    tracing::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections())
        .acquire_timeout(Duration::from_secs(config.db_timeout_seconds()))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect(database_url)
        .await
        .context("Failed to connect to database")?;

    tracing::info!(
        max_connections = config.db_max_connections(),
        "Database connected successfully"
    );

    // Workspace migrations/ relative to this crate's root
    let migrations_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../migrations");
    let migrator = sqlx::migrate::Migrator::new(migrations_dir)
        .await
        .context("Failed to load migrations")?;
    migrator
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database migrations applied");

    Ok(Some(pool))
}
