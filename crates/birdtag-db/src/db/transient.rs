//! Transient upload-match result repository
//!
//! Rows expire by time only. Reads ignore expired rows; `purge_expired` reclaims them.

use async_trait::async_trait;
use birdtag_core::{AppError, StorageUri, TagMap, TransientQueryResult};
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres};

#[async_trait]
pub trait TransientResultStore: Send + Sync {
    async fn put(&self, result: &TransientQueryResult) -> Result<(), AppError>;

    /// Unexpired result for `file_key`, if any
    async fn get(&self, file_key: &str) -> Result<Option<TransientQueryResult>, AppError>;

    /// Delete expired rows, returning how many were removed
    async fn purge_expired(&self) -> Result<u64, AppError>;
}

#[derive(Debug, FromRow)]
struct TransientRow {
    file_key: String,
    tags: Json<TagMap>,
    links: Vec<String>,
    expires_at: DateTime<Utc>,
}

impl TryFrom<TransientRow> for TransientQueryResult {
    type Error = AppError;

    fn try_from(row: TransientRow) -> Result<Self, Self::Error> {
        let links = row
            .links
            .iter()
            .map(|link| link.parse::<StorageUri>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| {
                AppError::Internal(format!(
                    "Stored link for {} is invalid: {}",
                    row.file_key, e
                ))
            })?;

        Ok(TransientQueryResult {
            file_key: row.file_key,
            tags: row.tags.0,
            links,
            expires_at: row.expires_at,
        })
    }
}

#[derive(Clone)]
pub struct PostgresTransientResultStore {
    pool: PgPool,
}

impl PostgresTransientResultStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TransientResultStore for PostgresTransientResultStore {
    #[tracing::instrument(skip(self, result), fields(db.table = "transient_query_results", db.operation = "upsert", file_key = %result.file_key))]
    async fn put(&self, result: &TransientQueryResult) -> Result<(), AppError> {
        let links: Vec<String> = result.links.iter().map(|uri| uri.to_string()).collect();

        sqlx::query(
            r#"
            INSERT INTO transient_query_results (file_key, tags, links, expires_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (file_key) DO UPDATE SET
                tags = EXCLUDED.tags,
                links = EXCLUDED.links,
                expires_at = EXCLUDED.expires_at
            "#,
        )
        .bind(&result.file_key)
        .bind(Json(&result.tags))
        .bind(&links)
        .bind(result.expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip(self), fields(db.table = "transient_query_results", db.operation = "select"))]
    async fn get(&self, file_key: &str) -> Result<Option<TransientQueryResult>, AppError> {
        let row = sqlx::query_as::<Postgres, TransientRow>(
            r#"
            SELECT file_key, tags, links, expires_at
            FROM transient_query_results
            WHERE file_key = $1 AND expires_at > NOW()
            "#,
        )
        .bind(file_key)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TransientQueryResult::try_from).transpose()
    }

    #[tracing::instrument(skip(self), fields(db.table = "transient_query_results", db.operation = "delete"))]
    async fn purge_expired(&self) -> Result<u64, AppError> {
        let rows_affected =
            sqlx::query("DELETE FROM transient_query_results WHERE expires_at <= NOW()")
                .execute(&self.pool)
                .await?
                .rows_affected();

        Ok(rows_affected)
    }
}
