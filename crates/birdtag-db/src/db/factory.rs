use std::sync::Arc;

use birdtag_core::{AppError, Config, MetadataBackend};
use sqlx::PgPool;

use super::media_record::{MetadataStore, PostgresMetadataStore};
use super::memory::{InMemoryMetadataStore, InMemorySubscriptionStore, InMemoryTransientResultStore};
use super::subscription::{PostgresSubscriptionStore, SubscriptionStore};
use super::transient::{PostgresTransientResultStore, TransientResultStore};

/// The three repositories every service is built from
#[derive(Clone)]
pub struct Repositories {
    pub metadata: Arc<dyn MetadataStore>,
    pub subscriptions: Arc<dyn SubscriptionStore>,
    pub transient_results: Arc<dyn TransientResultStore>,
}

impl Repositories {
    pub fn in_memory() -> Self {
        Self {
            metadata: Arc::new(InMemoryMetadataStore::new()),
            subscriptions: Arc::new(InMemorySubscriptionStore::new()),
            transient_results: Arc::new(InMemoryTransientResultStore::new()),
        }
    }

    pub fn postgres(pool: PgPool) -> Self {
        Self {
            metadata: Arc::new(PostgresMetadataStore::new(pool.clone())),
            subscriptions: Arc::new(PostgresSubscriptionStore::new(pool.clone())),
            transient_results: Arc::new(PostgresTransientResultStore::new(pool)),
        }
    }
}

/// Build repositories for the configured metadata backend.
///
/// `pool` must be present when the backend is PostgreSQL.
pub fn create_repositories(
    config: &Config,
    pool: Option<PgPool>,
) -> Result<Repositories, AppError> {
    match config.metadata_backend() {
        MetadataBackend::Postgres => {
            let pool = pool.ok_or_else(|| {
                AppError::Internal(
                    "PostgreSQL metadata backend selected but no pool was provided".to_string(),
                )
            })?;
            tracing::info!("Initializing PostgreSQL repositories");
            Ok(Repositories::postgres(pool))
        }
        MetadataBackend::Memory => {
            tracing::warn!("Initializing in-memory repositories; data is lost on restart");
            Ok(Repositories::in_memory())
        }
    }
}
