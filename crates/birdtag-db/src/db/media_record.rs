//! Media record repository
//!
//! Narrow get/put/update/delete/scan contract over the `media_records` table. There
//! is no secondary index on tags: queries scan the whole table and filter in memory.

use async_trait::async_trait;
use birdtag_core::{AppError, FileType, MediaRecord, StorageUri, TagMap};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres};

#[async_trait]
pub trait MetadataStore: Send + Sync {
    async fn get(&self, file_id: &str) -> Result<Option<MediaRecord>, AppError>;

    /// Insert or fully replace a record
    async fn put(&self, record: &MediaRecord) -> Result<(), AppError>;

    /// Replace the tag map of an existing record; `NotFound` if absent
    async fn update_tags(&self, file_id: &str, tags: &TagMap) -> Result<MediaRecord, AppError>;

    /// Remove a record; `NotFound` if absent
    async fn delete(&self, file_id: &str) -> Result<(), AppError>;

    /// Every record, in a stable order. Not isolated from concurrent writes.
    async fn scan(&self) -> Result<Vec<MediaRecord>, AppError>;

    /// Record whose original or thumbnail address equals `uri`
    async fn find_by_address(&self, uri: &StorageUri) -> Result<Option<MediaRecord>, AppError> {
        Ok(self
            .scan()
            .await?
            .into_iter()
            .find(|record| record.has_address(uri)))
    }

    /// Record whose thumbnail address equals `uri`
    async fn find_by_thumbnail(&self, uri: &StorageUri) -> Result<Option<MediaRecord>, AppError> {
        Ok(self
            .scan()
            .await?
            .into_iter()
            .find(|record| record.thumbnail_address.as_ref() == Some(uri)))
    }
}

#[derive(Debug, FromRow)]
struct MediaRecordRow {
    file_id: String,
    file_type: FileType,
    original_address: String,
    thumbnail_address: Option<String>,
    tags: Json<TagMap>,
}

impl TryFrom<MediaRecordRow> for MediaRecord {
    type Error = AppError;

    fn try_from(row: MediaRecordRow) -> Result<Self, Self::Error> {
        let original_address = row.original_address.parse::<StorageUri>().map_err(|e| {
            AppError::Internal(format!(
                "Stored original address for {} is invalid: {}",
                row.file_id, e
            ))
        })?;
        let thumbnail_address = row
            .thumbnail_address
            .as_deref()
            .map(str::parse::<StorageUri>)
            .transpose()
            .map_err(|e| {
                AppError::Internal(format!(
                    "Stored thumbnail address for {} is invalid: {}",
                    row.file_id, e
                ))
            })?;

        Ok(MediaRecord {
            file_id: row.file_id,
            file_type: row.file_type,
            original_address,
            thumbnail_address,
            tags: row.tags.0,
        })
    }
}

const SELECT_COLUMNS: &str =
    "SELECT file_id, file_type, original_address, thumbnail_address, tags FROM media_records";

#[derive(Clone)]
pub struct PostgresMetadataStore {
    pool: PgPool,
}

impl PostgresMetadataStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MetadataStore for PostgresMetadataStore {
    #[tracing::instrument(skip(self), fields(db.table = "media_records", db.operation = "select", db.record_id = %file_id))]
    async fn get(&self, file_id: &str) -> Result<Option<MediaRecord>, AppError> {
        let row = sqlx::query_as::<Postgres, MediaRecordRow>(&format!(
            "{} WHERE file_id = $1",
            SELECT_COLUMNS
        ))
        .bind(file_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(MediaRecord::try_from).transpose()
    }

    #[tracing::instrument(skip(self, record), fields(db.table = "media_records", db.operation = "upsert", db.record_id = %record.file_id))]
    async fn put(&self, record: &MediaRecord) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO media_records (file_id, file_type, original_address, thumbnail_address, tags)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (file_id) DO UPDATE SET
                file_type = EXCLUDED.file_type,
                original_address = EXCLUDED.original_address,
                thumbnail_address = EXCLUDED.thumbnail_address,
                tags = EXCLUDED.tags,
                updated_at = NOW()
            "#,
        )
        .bind(&record.file_id)
        .bind(record.file_type)
        .bind(record.original_address.to_string())
        .bind(record.thumbnail_address.as_ref().map(|uri| uri.to_string()))
        .bind(Json(&record.tags))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip(self, tags), fields(db.table = "media_records", db.operation = "update", db.record_id = %file_id, tag_count = tags.len()))]
    async fn update_tags(&self, file_id: &str, tags: &TagMap) -> Result<MediaRecord, AppError> {
        let row = sqlx::query_as::<Postgres, MediaRecordRow>(
            r#"
            UPDATE media_records
            SET tags = $2, updated_at = NOW()
            WHERE file_id = $1
            RETURNING file_id, file_type, original_address, thumbnail_address, tags
            "#,
        )
        .bind(file_id)
        .bind(Json(tags))
        .fetch_optional(&self.pool)
        .await?;

        let row = row.ok_or_else(|| AppError::NotFound(format!("File {} not found", file_id)))?;
        MediaRecord::try_from(row)
    }

    #[tracing::instrument(skip(self), fields(db.table = "media_records", db.operation = "delete", db.record_id = %file_id))]
    async fn delete(&self, file_id: &str) -> Result<(), AppError> {
        let rows_affected = sqlx::query("DELETE FROM media_records WHERE file_id = $1")
            .bind(file_id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if rows_affected == 0 {
            return Err(AppError::NotFound(format!("File {} not found", file_id)));
        }

        Ok(())
    }

    #[tracing::instrument(skip(self), fields(db.table = "media_records", db.operation = "scan"))]
    async fn scan(&self) -> Result<Vec<MediaRecord>, AppError> {
        let start = std::time::Instant::now();
        let rows = sqlx::query_as::<Postgres, MediaRecordRow>(&format!(
            "{} ORDER BY file_id",
            SELECT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        tracing::debug!(
            row_count = rows.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Scanned media records"
        );

        rows.into_iter().map(MediaRecord::try_from).collect()
    }

    #[tracing::instrument(skip(self), fields(db.table = "media_records", db.operation = "select", uri = %uri))]
    async fn find_by_address(&self, uri: &StorageUri) -> Result<Option<MediaRecord>, AppError> {
        let row = sqlx::query_as::<Postgres, MediaRecordRow>(&format!(
            "{} WHERE original_address = $1 OR thumbnail_address = $1 ORDER BY file_id LIMIT 1",
            SELECT_COLUMNS
        ))
        .bind(uri.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(MediaRecord::try_from).transpose()
    }

    #[tracing::instrument(skip(self), fields(db.table = "media_records", db.operation = "select", uri = %uri))]
    async fn find_by_thumbnail(&self, uri: &StorageUri) -> Result<Option<MediaRecord>, AppError> {
        let row = sqlx::query_as::<Postgres, MediaRecordRow>(&format!(
            "{} WHERE thumbnail_address = $1 ORDER BY file_id LIMIT 1",
            SELECT_COLUMNS
        ))
        .bind(uri.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(MediaRecord::try_from).transpose()
    }
}
