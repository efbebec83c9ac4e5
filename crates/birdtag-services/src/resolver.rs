//! External address to `file_id` resolution.

use std::sync::Arc;

use birdtag_core::{AppError, MediaRecord};
use birdtag_db::MetadataStore;
use birdtag_storage::{AddressNormalizer, ThumbnailNaming};

/// Maps an address a caller holds (original, thumbnail, public or signed) to the
/// record it belongs to.
#[derive(Clone)]
pub struct AddressResolver {
    metadata: Arc<dyn MetadataStore>,
    normalizer: AddressNormalizer,
    naming: ThumbnailNaming,
}

impl AddressResolver {
    pub fn new(
        metadata: Arc<dyn MetadataStore>,
        normalizer: AddressNormalizer,
        naming: ThumbnailNaming,
    ) -> Self {
        Self {
            metadata,
            normalizer,
            naming,
        }
    }

    /// Resolution order: exact original/thumbnail match, then the original whose
    /// stem a thumbnail-shaped key names. Nothing else resolves.
    #[tracing::instrument(skip(self))]
    pub async fn resolve(&self, address: &str) -> Result<MediaRecord, AppError> {
        let uri = self.normalizer.from_external(address)?;

        if let Some(record) = self.metadata.find_by_address(&uri).await? {
            return Ok(record);
        }

        if let Some(stem) = self.naming.original_stem(&uri) {
            let candidate = self.metadata.scan().await?.into_iter().find(|record| {
                record.original_address.bucket == uri.bucket
                    && record.original_address.stem() == stem
            });
            if let Some(record) = candidate {
                tracing::debug!(file_id = %record.file_id, "Resolved thumbnail address by naming convention");
                return Ok(record);
            }
        }

        Err(AppError::NotFound(format!(
            "No media record for address {}",
            address
        )))
    }

    pub async fn resolve_file_id(&self, address: &str) -> Result<String, AppError> {
        self.resolve(address).await.map(|record| record.file_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{image_record, TestContext};
    use birdtag_core::StorageUri;

    #[tokio::test]
    async fn test_resolves_original_and_thumbnail() {
        let ctx = TestContext::new();
        ctx.insert(image_record("crow.jpg", &[("crow", 1)])).await;

        let resolver = ctx.resolver();
        assert_eq!(
            resolver
                .resolve_file_id("https://media.s3.us-east-1.amazonaws.com/crow.jpg")
                .await
                .unwrap(),
            "crow.jpg"
        );
        assert_eq!(
            resolver
                .resolve_file_id("s3://media/thumbnails/crow-thumb.jpg")
                .await
                .unwrap(),
            "crow.jpg"
        );
    }

    #[tokio::test]
    async fn test_infers_original_from_thumbnail_name() {
        let ctx = TestContext::new();
        let mut record = image_record("myna.png", &[("myna", 2)]);
        record.thumbnail_address = None;
        ctx.insert(record).await;

        let file_id = ctx
            .resolver()
            .resolve_file_id("s3://media/thumbnails/myna-thumb.jpg")
            .await
            .unwrap();
        assert_eq!(file_id, "myna.png");
    }

    #[tokio::test]
    async fn test_unknown_address_is_not_found() {
        let ctx = TestContext::new();
        let err = ctx
            .resolver()
            .resolve("s3://media/missing.jpg")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let err = ctx.resolver().resolve("ftp://nope").await.unwrap_err();
        assert!(matches!(err, AppError::MalformedAddress(_)));
    }

    #[tokio::test]
    async fn test_same_base_name_elsewhere_is_not_found() {
        let ctx = TestContext::new();
        let mut record = image_record("crow.jpg", &[("crow", 1)]);
        record.original_address = StorageUri::new("media", "uploads/crow.jpg");
        ctx.insert(record).await;

        let err = ctx
            .resolver()
            .resolve("s3://media/somewhere/else/crow.jpg")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
