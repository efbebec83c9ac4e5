//! Species detection collaborator
//!
//! Model loading and inference live behind an HTTP service; this crate only
//! ships the request/response plumbing.

use async_trait::async_trait;
use birdtag_core::{AppError, FileType, StorageUri, TagMap};
#[cfg(feature = "detector-http")]
use serde::{Deserialize, Serialize};
#[cfg(feature = "detector-http")]
use std::collections::BTreeMap;
#[cfg(feature = "detector-http")]
use std::time::Duration;

#[async_trait]
pub trait SpeciesDetector: Send + Sync {
    /// Detect species in the object at `location`. Returned names are normalised
    /// and counts are positive.
    async fn detect(&self, location: &StorageUri, file_type: FileType) -> Result<TagMap, AppError>;
}

/// Stand-in used when no detector endpoint is configured; every call fails.
#[derive(Debug, Clone, Default)]
pub struct UnconfiguredDetector;

#[async_trait]
impl SpeciesDetector for UnconfiguredDetector {
    async fn detect(&self, location: &StorageUri, _file_type: FileType) -> Result<TagMap, AppError> {
        Err(AppError::Detection(format!(
            "Species detector is not configured, cannot process {}",
            location
        )))
    }
}

#[cfg(feature = "detector-http")]
#[derive(Debug, Serialize)]
struct DetectRequest<'a> {
    bucket: &'a str,
    key: &'a str,
    file_type: FileType,
}

#[cfg(feature = "detector-http")]
#[derive(Debug, Deserialize)]
struct DetectResponse {
    #[serde(default)]
    tags: BTreeMap<String, i64>,
}

/// Detector reached over HTTP: `POST {url}` with `{bucket, key, file_type}`,
/// answered by `{"tags": {name: count}}`.
#[cfg(feature = "detector-http")]
#[derive(Debug, Clone)]
pub struct HttpSpeciesDetector {
    http_client: reqwest::Client,
    url: String,
}

#[cfg(feature = "detector-http")]
impl HttpSpeciesDetector {
    pub fn new(url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        use anyhow::Context;

        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client for species detector")?;

        Ok(Self {
            http_client,
            url: url.into(),
        })
    }
}

#[cfg(feature = "detector-http")]
#[async_trait]
impl SpeciesDetector for HttpSpeciesDetector {
    #[tracing::instrument(skip(self), fields(uri = %location, file_type = %file_type))]
    async fn detect(&self, location: &StorageUri, file_type: FileType) -> Result<TagMap, AppError> {
        let start = std::time::Instant::now();

        let response = self
            .http_client
            .post(&self.url)
            .json(&DetectRequest {
                bucket: &location.bucket,
                key: &location.key,
                file_type,
            })
            .send()
            .await
            .map_err(|e| AppError::Detection(format!("Failed to reach species detector: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Detection(format!(
                "Species detector request failed: {} - {}",
                status, error_text
            )));
        }

        let body: DetectResponse = response.json().await.map_err(|e| {
            AppError::Detection(format!("Failed to parse species detector response: {}", e))
        })?;

        let tags = birdtag_core::models::tags::tag_map_from_counts(body.tags);

        tracing::debug!(
            tag_count = tags.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Species detection finished"
        );

        Ok(tags)
    }
}
