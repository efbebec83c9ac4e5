//! Upload-and-match
//!
//! A client uploads a sample file, the detector tags it and the matching media
//! records are stored as a short-lived result keyed by the sample's object key.
//! The sample itself is removed afterwards. Clients poll for the result until
//! it appears.

use std::collections::BTreeSet;
use std::sync::Arc;

use birdtag_core::{AppError, FileType, StorageUri, TagMap, TransientQueryResult};
use birdtag_db::TransientResultStore;
use birdtag_storage::{AddressNormalizer, Storage};
use serde::Serialize;

use crate::detector::SpeciesDetector;
use crate::query::QueryEngine;

/// Result handed back to a polling client, with freshly signed links
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadMatchResult {
    pub tags: TagMap,
    pub links: Vec<String>,
}

#[derive(Clone)]
pub struct UploadMatcher {
    detector: Arc<dyn SpeciesDetector>,
    query: QueryEngine,
    storage: Arc<dyn Storage>,
    results: Arc<dyn TransientResultStore>,
    normalizer: AddressNormalizer,
    ttl_secs: u64,
}

impl UploadMatcher {
    pub fn new(
        detector: Arc<dyn SpeciesDetector>,
        query: QueryEngine,
        storage: Arc<dyn Storage>,
        results: Arc<dyn TransientResultStore>,
        normalizer: AddressNormalizer,
        ttl_secs: u64,
    ) -> Self {
        Self {
            detector,
            query,
            storage,
            results,
            normalizer,
            ttl_secs,
        }
    }

    /// Detect species in the sample, find records carrying any of them and store
    /// the matches under the sample's key.
    #[tracing::instrument(skip(self), fields(uri = %location))]
    pub async fn match_upload(&self, location: StorageUri) -> Result<TransientQueryResult, AppError> {
        let file_type = location
            .extension()
            .and_then(|ext| FileType::from_extension(&ext))
            .ok_or_else(|| AppError::InvalidInput("Unsupported file type".to_string()))?;

        let tags = self.detector.detect(&location, file_type).await?;

        let links = if tags.is_empty() {
            Vec::new()
        } else {
            let species: BTreeSet<String> = tags.keys().cloned().collect();
            self.query
                .presence_or(&species)
                .await?
                .iter()
                .map(|record| record.display_address().clone())
                .collect()
        };

        if let Err(e) = self.storage.delete(&location).await {
            tracing::warn!(error = %e, uri = %location, "Failed to delete sample object");
        }

        let result = TransientQueryResult::new(location.key.clone(), tags, links, self.ttl_secs);
        self.results.put(&result).await?;

        tracing::info!(
            file_key = %result.file_key,
            tag_count = result.tags.len(),
            match_count = result.links.len(),
            "Upload match stored"
        );

        Ok(result)
    }

    /// Stored result for `file_key` with signed links. Absent or expired results
    /// read as still processing.
    #[tracing::instrument(skip(self))]
    pub async fn poll(&self, file_key: &str) -> Result<UploadMatchResult, AppError> {
        let result = self
            .results
            .get(file_key)
            .await?
            .ok_or_else(|| AppError::NotFound("Processing".to_string()))?;

        let mut links = Vec::with_capacity(result.links.len());
        for link in &result.links {
            links.push(self.normalizer.signed_address(link).await?);
        }

        Ok(UploadMatchResult {
            tags: result.tags,
            links,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{audio_record, image_record, TestContext};

    #[tokio::test]
    async fn test_match_then_poll() {
        let ctx = TestContext::new();
        ctx.insert(image_record("crow.jpg", &[("crow", 3)])).await;
        ctx.insert(audio_record("myna.wav", &[("myna", 1)])).await;
        ctx.insert(image_record("eagle.jpg", &[("eagle", 1)])).await;
        ctx.detector.set_tags(&[("crow", 1), ("myna", 2)]);

        let sample = StorageUri::new("uploads", "sample-1.jpg");
        ctx.storage.put_object(&sample).await;

        let matcher = ctx.upload_matcher();
        let stored = matcher.match_upload(sample.clone()).await.unwrap();
        assert_eq!(
            stored.links,
            vec![
                StorageUri::new("media", "thumbnails/crow-thumb.jpg"),
                StorageUri::new("media", "myna.wav"),
            ]
        );
        assert!(!ctx.storage.contains(&sample));

        let result = matcher.poll("sample-1.jpg").await.unwrap();
        assert_eq!(result.tags.get("myna"), Some(&2));
        assert_eq!(result.links.len(), 2);
        assert!(result.links[0].starts_with(
            "https://media.s3.us-east-1.amazonaws.com/thumbnails/crow-thumb.jpg?X-Amz-Expires=3600"
        ));
    }

    #[tokio::test]
    async fn test_no_detections_stores_empty_result() {
        let ctx = TestContext::new();
        ctx.insert(image_record("crow.jpg", &[("crow", 3)])).await;

        let matcher = ctx.upload_matcher();
        matcher
            .match_upload(StorageUri::new("uploads", "blank.png"))
            .await
            .unwrap();

        let result = matcher.poll("blank.png").await.unwrap();
        assert!(result.tags.is_empty());
        assert!(result.links.is_empty());
    }

    #[tokio::test]
    async fn test_poll_before_result_is_processing() {
        let ctx = TestContext::new();
        let err = ctx.upload_matcher().poll("unknown.jpg").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(ref m) if m == "Processing"));
    }

    #[tokio::test]
    async fn test_sample_delete_failure_is_ignored() {
        let ctx = TestContext::new();
        let sample = StorageUri::new("uploads", "sample.jpg");
        ctx.storage.fail_deletes_for(sample.clone());

        assert!(ctx.upload_matcher().match_upload(sample).await.is_ok());
    }
}
