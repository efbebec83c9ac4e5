use crate::address::PublicEndpoint;
use crate::traits::{Storage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use birdtag_core::StorageUri;
use http::Method;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path;
use object_store::signer::Signer;
use object_store::Error as ObjectStoreError;
use object_store::{ObjectStoreExt, Result as ObjectResult};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;

/// S3 storage implementation
///
/// Records may reference any bucket, so one `AmazonS3` client is built lazily per
/// bucket and reused afterwards.
pub struct S3Storage {
    stores: RwLock<HashMap<String, AmazonS3>>,
    region: String,
    endpoint_url: Option<String>, // Custom endpoint for S3-compatible providers
    public_endpoint: PublicEndpoint,
}

impl S3Storage {
    /// Create a new S3Storage instance
    ///
    /// # Arguments
    /// * `region` - AWS region (or region identifier for S3-compatible providers)
    /// * `endpoint_url` - Optional custom endpoint URL for S3-compatible providers
    ///   (e.g., "http://localhost:9000" for MinIO)
    pub fn new(region: String, endpoint_url: Option<String>) -> Self {
        let public_endpoint = match endpoint_url {
            Some(ref endpoint) => PublicEndpoint::PathStyle {
                base_url: endpoint.trim_end_matches('/').to_string(),
            },
            None => PublicEndpoint::Aws {
                region: region.clone(),
            },
        };

        S3Storage {
            stores: RwLock::new(HashMap::new()),
            region,
            endpoint_url,
            public_endpoint,
        }
    }

    fn build_store(&self, bucket: &str) -> StorageResult<AmazonS3> {
        let mut builder = AmazonS3Builder::from_env()
            .with_region(self.region.clone())
            .with_bucket_name(bucket.to_string());

        if let Some(ref endpoint) = self.endpoint_url {
            let allow_http = endpoint.starts_with("http://");
            builder = builder
                .with_endpoint(endpoint.clone())
                .with_allow_http(allow_http);
        }

        builder
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))
    }

    async fn store_for(&self, bucket: &str) -> StorageResult<AmazonS3> {
        if let Some(store) = self.stores.read().await.get(bucket) {
            return Ok(store.clone());
        }

        let mut stores = self.stores.write().await;
        if let Some(store) = stores.get(bucket) {
            return Ok(store.clone());
        }

        let store = self.build_store(bucket)?;
        stores.insert(bucket.to_string(), store.clone());
        tracing::debug!(bucket = %bucket, region = %self.region, "Built S3 client for bucket");
        Ok(store)
    }
}

#[async_trait]
impl Storage for S3Storage {
    async fn delete(&self, location: &StorageUri) -> StorageResult<()> {
        let store = self.store_for(&location.bucket).await?;
        let start = std::time::Instant::now();
        let path = Path::from(location.key.clone());

        let result: ObjectResult<_> = store.delete(&path).await;

        match result {
            Ok(()) | Err(ObjectStoreError::NotFound { .. }) => {}
            Err(e) => {
                tracing::error!(
                    error = %e,
                    bucket = %location.bucket,
                    key = %location.key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 delete failed"
                );
                return Err(StorageError::DeleteFailed(e.to_string()));
            }
        }

        tracing::info!(
            bucket = %location.bucket,
            key = %location.key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 delete successful"
        );

        Ok(())
    }

    async fn exists(&self, location: &StorageUri) -> StorageResult<bool> {
        let store = self.store_for(&location.bucket).await?;
        let path = Path::from(location.key.clone());
        match store.head(&path).await {
            Ok(_) => Ok(true),
            Err(ObjectStoreError::NotFound { .. }) => Ok(false),
            Err(e) => Err(StorageError::BackendError(e.to_string())),
        }
    }

    async fn presigned_get_url(
        &self,
        location: &StorageUri,
        expires_in: Duration,
    ) -> StorageResult<String> {
        let store = self.store_for(&location.bucket).await?;
        let path = Path::from(location.key.clone());
        let url_result: ObjectResult<_> = store.signed_url(Method::GET, &path, expires_in).await;

        let url = url_result
            .map_err(|e| StorageError::SigningFailed(e.to_string()))?
            .to_string();

        Ok(url)
    }

    fn public_endpoint(&self) -> &PublicEndpoint {
        &self.public_endpoint
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_endpoint_defaults_to_aws() {
        let storage = S3Storage::new("eu-west-1".to_string(), None);
        assert_eq!(
            storage.public_endpoint().format(&StorageUri::new("media", "crow.jpg")),
            "https://media.s3.eu-west-1.amazonaws.com/crow.jpg"
        );
    }

    #[test]
    fn test_public_endpoint_uses_custom_endpoint() {
        let storage = S3Storage::new(
            "us-east-1".to_string(),
            Some("http://localhost:9000/".to_string()),
        );
        assert_eq!(
            storage.public_endpoint().format(&StorageUri::new("media", "crow.jpg")),
            "http://localhost:9000/media/crow.jpg"
        );
    }
}
