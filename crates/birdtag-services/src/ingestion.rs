//! Ingestion of newly created storage objects
//!
//! An object-created notification becomes a media record: the file type comes
//! from the key's extension, tags come from the species detector, and images
//! get a thumbnail address only once the conventional thumbnail object exists.

use std::sync::Arc;

use birdtag_core::{AppError, ChangeEvent, ChangeKind, FileType, MediaRecord, StorageUri};
use birdtag_db::MetadataStore;
use birdtag_storage::{Storage, ThumbnailNaming};

use crate::detector::SpeciesDetector;
use crate::feed::ChangeFeed;

#[derive(Clone)]
pub struct IngestionService {
    metadata: Arc<dyn MetadataStore>,
    storage: Arc<dyn Storage>,
    detector: Arc<dyn SpeciesDetector>,
    naming: ThumbnailNaming,
    feed: ChangeFeed,
}

impl IngestionService {
    pub fn new(
        metadata: Arc<dyn MetadataStore>,
        storage: Arc<dyn Storage>,
        detector: Arc<dyn SpeciesDetector>,
        naming: ThumbnailNaming,
        feed: ChangeFeed,
    ) -> Self {
        Self {
            metadata,
            storage,
            detector,
            naming,
            feed,
        }
    }

    #[tracing::instrument(skip(self), fields(uri = %location, file_id = tracing::field::Empty))]
    pub async fn ingest(&self, location: StorageUri) -> Result<MediaRecord, AppError> {
        let file_id = location.file_name().to_string();
        if file_id.is_empty() {
            return Err(AppError::InvalidInput("Object key has no file name".to_string()));
        }
        tracing::Span::current().record("file_id", file_id.as_str());

        let file_type = location
            .extension()
            .and_then(|ext| FileType::from_extension(&ext))
            .ok_or_else(|| AppError::InvalidInput("Unsupported file type".to_string()))?;

        let tags = self.detector.detect(&location, file_type).await?;

        let thumbnail_address = match file_type {
            FileType::Image => self.existing_thumbnail(&location).await,
            FileType::Video | FileType::Audio => None,
        };

        let record = MediaRecord {
            file_id,
            file_type,
            original_address: location,
            thumbnail_address,
            tags,
        };

        self.metadata.put(&record).await?;

        tracing::info!(
            file_id = %record.file_id,
            file_type = %record.file_type,
            tag_count = record.tags.len(),
            has_thumbnail = record.thumbnail_address.is_some(),
            "Media record ingested"
        );

        self.feed
            .publish(ChangeEvent::from_record(ChangeKind::Insert, &record))
            .await;

        Ok(record)
    }

    async fn existing_thumbnail(&self, original: &StorageUri) -> Option<StorageUri> {
        let thumbnail = self.naming.thumbnail_for(original);
        match self.storage.exists(&thumbnail).await {
            Ok(true) => Some(thumbnail),
            Ok(false) => None,
            Err(e) => {
                tracing::warn!(error = %e, uri = %thumbnail, "Could not check thumbnail object");
                None
            }
        }
    }
}
