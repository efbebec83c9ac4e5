//! Query engine over the media record corpus
//!
//! Every query scans the full table and filters in memory. Results keep scan
//! order.

use std::collections::BTreeSet;
use std::sync::Arc;

use birdtag_core::models::tags::{contains_any, meets_thresholds, normalize_tag};
use birdtag_core::{AppError, FileType, MediaRecord, TagMap};
use birdtag_db::MetadataStore;
use birdtag_storage::AddressNormalizer;
use serde::Serialize;

/// One entry of the full media listing, with freshly signed addresses
#[derive(Debug, Clone, Serialize)]
pub struct MediaListing {
    pub file_id: String,
    pub file_type: FileType,
    pub tags: TagMap,
    pub original_url: Option<String>,
    pub thumbnail_url: Option<String>,
}

#[derive(Clone)]
pub struct QueryEngine {
    metadata: Arc<dyn MetadataStore>,
    normalizer: AddressNormalizer,
}

impl QueryEngine {
    pub fn new(metadata: Arc<dyn MetadataStore>, normalizer: AddressNormalizer) -> Self {
        Self {
            metadata,
            normalizer,
        }
    }

    /// Records holding at least `min_count` of every filtered tag.
    #[tracing::instrument(skip(self, filters), fields(filter_count = filters.len(), match_count = tracing::field::Empty))]
    pub async fn threshold_and(&self, filters: &TagMap) -> Result<Vec<MediaRecord>, AppError> {
        let filters: TagMap = filters
            .iter()
            .map(|(name, count)| (normalize_tag(name), *count))
            .filter(|(name, _)| !name.is_empty())
            .collect();
        if filters.is_empty() {
            return Err(AppError::InvalidQuery(
                "At least one tag filter is required".to_string(),
            ));
        }

        let matches: Vec<MediaRecord> = self
            .metadata
            .scan()
            .await?
            .into_iter()
            .filter(|record| meets_thresholds(&record.tags, &filters))
            .collect();

        tracing::Span::current().record("match_count", matches.len());
        Ok(matches)
    }

    /// Records carrying any of the given species.
    #[tracing::instrument(skip(self, species), fields(species_count = species.len(), match_count = tracing::field::Empty))]
    pub async fn presence_or(
        &self,
        species: &BTreeSet<String>,
    ) -> Result<Vec<MediaRecord>, AppError> {
        let species: BTreeSet<String> = species
            .iter()
            .map(|name| normalize_tag(name))
            .filter(|name| !name.is_empty())
            .collect();
        if species.is_empty() {
            return Err(AppError::InvalidQuery(
                "At least one species is required".to_string(),
            ));
        }

        let matches: Vec<MediaRecord> = self
            .metadata
            .scan()
            .await?
            .into_iter()
            .filter(|record| contains_any(&record.tags, &species))
            .collect();

        tracing::Span::current().record("match_count", matches.len());
        Ok(matches)
    }

    /// The record whose thumbnail is the given address.
    #[tracing::instrument(skip(self))]
    pub async fn thumbnail_reverse_lookup(&self, address: &str) -> Result<MediaRecord, AppError> {
        let uri = self.normalizer.from_external(address)?;

        self.metadata
            .find_by_thumbnail(&uri)
            .await?
            .ok_or_else(|| AppError::NotFound("Thumbnail not found".to_string()))
    }

    /// Signed address of the original behind a thumbnail address.
    pub async fn original_url_for_thumbnail(&self, address: &str) -> Result<String, AppError> {
        let record = self.thumbnail_reverse_lookup(address).await?;
        self.normalizer.signed_address(&record.original_address).await
    }

    /// Signed display address of each record, in order.
    pub async fn signed_links(&self, records: &[MediaRecord]) -> Result<Vec<String>, AppError> {
        let mut links = Vec::with_capacity(records.len());
        for record in records {
            links.push(self.normalizer.signed_address(record.display_address()).await?);
        }
        Ok(links)
    }

    /// Every record with both addresses signed. An address that fails to sign is
    /// omitted instead of failing the listing.
    #[tracing::instrument(skip(self))]
    pub async fn list_all(&self) -> Result<Vec<MediaListing>, AppError> {
        let records = self.metadata.scan().await?;
        let mut listings = Vec::with_capacity(records.len());

        for record in records {
            let original_url = self.sign_or_skip(&record.original_address).await;
            let thumbnail_url = match record.thumbnail_address {
                Some(ref thumbnail) => self.sign_or_skip(thumbnail).await,
                None => None,
            };

            listings.push(MediaListing {
                file_id: record.file_id,
                file_type: record.file_type,
                tags: record.tags,
                original_url,
                thumbnail_url,
            });
        }

        Ok(listings)
    }

    async fn sign_or_skip(&self, uri: &birdtag_core::StorageUri) -> Option<String> {
        match self.normalizer.signed_address(uri).await {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::warn!(error = %e, uri = %uri, "Skipping address that could not be signed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{audio_record, image_record, TestContext};
    use birdtag_core::StorageUri;

    fn filters(pairs: &[(&str, u32)]) -> TagMap {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn species(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_threshold_and_matches() {
        let ctx = TestContext::new();
        ctx.insert(image_record("a1.jpg", &[("crow", 3), ("pigeon", 1)])).await;
        let engine = ctx.query_engine();

        let hits = engine.threshold_and(&filters(&[("crow", 2)])).await.unwrap();
        assert_eq!(hits.len(), 1);

        let hits = engine.threshold_and(&filters(&[("crow", 4)])).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_threshold_and_end_to_end_exact_count() {
        let ctx = TestContext::new();
        ctx.insert(image_record("a1.jpg", &[("crow", 3)])).await;
        ctx.insert(image_record("a2.jpg", &[("crow", 1)])).await;
        let engine = ctx.query_engine();

        let hits = engine.threshold_and(&filters(&[("crow", 3)])).await.unwrap();
        let ids: Vec<_> = hits.iter().map(|r| r.file_id.as_str()).collect();
        assert_eq!(ids, vec!["a1.jpg"]);

        let hits = engine.threshold_and(&filters(&[("Crow", 4)])).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_empty_filters_are_invalid() {
        let ctx = TestContext::new();
        let err = ctx.query_engine().threshold_and(&TagMap::new()).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidQuery(_)));

        let err = ctx
            .query_engine()
            .presence_or(&BTreeSet::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidQuery(_)));
    }

    #[tokio::test]
    async fn test_presence_or() {
        let ctx = TestContext::new();
        ctx.insert(image_record("pigeon.jpg", &[("pigeon", 2)])).await;
        ctx.insert(image_record("myna.jpg", &[("myna", 1)])).await;
        let engine = ctx.query_engine();

        let hits = engine.presence_or(&species(&["crow", "myna"])).await.unwrap();
        let ids: Vec<_> = hits.iter().map(|r| r.file_id.as_str()).collect();
        assert_eq!(ids, vec!["myna.jpg"]);
    }

    #[tokio::test]
    async fn test_signed_links_project_thumbnail_for_images_only() {
        let ctx = TestContext::new();
        ctx.insert(image_record("crow.jpg", &[("crow", 1)])).await;
        ctx.insert(audio_record("crow.wav", &[("crow", 1)])).await;
        let engine = ctx.query_engine();

        let hits = engine.threshold_and(&filters(&[("crow", 1)])).await.unwrap();
        let links = engine.signed_links(&hits).await.unwrap();
        assert_eq!(links.len(), 2);
        assert!(links[0].contains("thumbnails/crow-thumb.jpg"));
        assert!(links[0].contains("X-Amz-Expires=3600"));
        assert!(links[1].contains("/crow.wav?"));
    }

    #[tokio::test]
    async fn test_thumbnail_reverse_lookup() {
        let ctx = TestContext::new();
        ctx.insert(image_record("crow.jpg", &[("crow", 1)])).await;
        let engine = ctx.query_engine();

        let url = engine
            .original_url_for_thumbnail(
                "https://media.s3.us-east-1.amazonaws.com/thumbnails/crow-thumb.jpg",
            )
            .await
            .unwrap();
        assert!(url.starts_with("https://media.s3.us-east-1.amazonaws.com/crow.jpg?"));

        let err = engine
            .thumbnail_reverse_lookup("s3://media/crow.jpg")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_reverse_lookup_ignores_matching_original() {
        let ctx = TestContext::new();
        let mut shadow = image_record("a-copy.jpg", &[]);
        shadow.original_address = StorageUri::new("media", "thumbnails/zebra-thumb.jpg");
        shadow.thumbnail_address = None;
        ctx.insert(shadow).await;
        ctx.insert(image_record("zebra.jpg", &[])).await;

        let record = ctx
            .query_engine()
            .thumbnail_reverse_lookup("s3://media/thumbnails/zebra-thumb.jpg")
            .await
            .unwrap();
        assert_eq!(record.file_id, "zebra.jpg");
    }

    #[tokio::test]
    async fn test_signing_failure_propagates_from_links() {
        let ctx = TestContext::new();
        ctx.insert(image_record("crow.jpg", &[("crow", 1)])).await;
        ctx.storage.set_fail_signing(true);
        let engine = ctx.query_engine();

        let hits = engine.threshold_and(&filters(&[("crow", 1)])).await.unwrap();
        let err = engine.signed_links(&hits).await.unwrap_err();
        assert!(matches!(err, AppError::SigningError(_)));

        let listing = engine.list_all().await.unwrap();
        assert_eq!(listing.len(), 1);
        assert!(listing[0].original_url.is_none());
    }
}
