use crate::address::PublicEndpoint;
use crate::traits::{Storage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use birdtag_core::StorageUri;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

/// Local filesystem storage implementation
///
/// Objects are stored at `{base_path}/{bucket}/{key}` and served from
/// `{base_url}/{bucket}/{key}`.
#[derive(Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
    public_endpoint: PublicEndpoint,
}

impl LocalStorage {
    /// Create a new LocalStorage instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory for object storage (e.g., "/var/lib/birdtag/media")
    /// * `base_url` - Base URL for serving files (e.g., "http://localhost:3000/media")
    pub async fn new(base_path: impl Into<PathBuf>, base_url: String) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStorage {
            base_path,
            public_endpoint: PublicEndpoint::PathStyle {
                base_url: base_url.trim_end_matches('/').to_string(),
            },
        })
    }

    /// Convert a location to a filesystem path, rejecting anything that could
    /// escape the base storage directory.
    fn location_to_path(&self, location: &StorageUri) -> StorageResult<PathBuf> {
        for part in [&location.bucket, &location.key] {
            if part.is_empty() || part.contains("..") || part.starts_with('/') || part.contains('\\') {
                return Err(StorageError::InvalidKey(
                    "Storage key contains invalid characters".to_string(),
                ));
            }
        }
        if location.bucket.contains('/') {
            return Err(StorageError::InvalidKey(
                "Bucket name contains invalid characters".to_string(),
            ));
        }

        let path = self.base_path.join(&location.bucket).join(&location.key);

        let base_canonical = self.base_path.canonicalize().map_err(|e| {
            StorageError::ConfigError(format!("Failed to canonicalize base path: {}", e))
        })?;

        if let Ok(canonical) = path.canonicalize() {
            if canonical.strip_prefix(&base_canonical).is_err() {
                return Err(StorageError::InvalidKey(
                    "Storage key resolves outside storage directory".to_string(),
                ));
            }
        }

        Ok(path)
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn delete(&self, location: &StorageUri) -> StorageResult<()> {
        let path = self.location_to_path(location)?;
        let start = std::time::Instant::now();

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(());
        }

        fs::remove_file(&path).await.map_err(|e| {
            StorageError::DeleteFailed(format!("Failed to delete file {}: {}", path.display(), e))
        })?;

        tracing::info!(
            path = %path.display(),
            uri = %location,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage delete successful"
        );

        Ok(())
    }

    async fn exists(&self, location: &StorageUri) -> StorageResult<bool> {
        let path = self.location_to_path(location)?;
        Ok(fs::try_exists(&path).await.unwrap_or(false))
    }

    async fn presigned_get_url(
        &self,
        location: &StorageUri,
        _expires_in: Duration,
    ) -> StorageResult<String> {
        self.location_to_path(location)?;
        Ok(self.public_endpoint.format(location))
    }

    fn public_endpoint(&self) -> &PublicEndpoint {
        &self.public_endpoint
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}

#[cfg(all(test, feature = "storage-local"))]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn storage(dir: &Path) -> LocalStorage {
        LocalStorage::new(dir, "http://localhost:3000/media".to_string())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_local_storage_exists_delete() {
        let dir = tempdir().unwrap();
        let storage = storage(dir.path()).await;
        let location = StorageUri::new("media", "uploads/crow.jpg");

        assert!(!storage.exists(&location).await.unwrap());
        let file = dir.path().join("media/uploads/crow.jpg");
        fs::create_dir_all(file.parent().unwrap()).await.unwrap();
        fs::write(&file, b"jpeg").await.unwrap();
        assert!(storage.exists(&location).await.unwrap());

        storage.delete(&location).await.unwrap();
        assert!(!storage.exists(&location).await.unwrap());
    }

    #[tokio::test]
    async fn test_path_traversal_rejected() {
        let dir = tempdir().unwrap();
        let storage = storage(dir.path()).await;

        let result = storage.delete(&StorageUri::new("media", "../../etc/passwd")).await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));

        let result = storage.exists(&StorageUri::new("..", "passwd")).await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));

        let result = storage.exists(&StorageUri::new("media", "/etc/passwd")).await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));
    }

    #[tokio::test]
    async fn test_local_storage_delete_nonexistent() {
        let dir = tempdir().unwrap();
        let storage = storage(dir.path()).await;

        let result = storage.delete(&StorageUri::new("media", "missing.jpg")).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_presigned_url_is_public_path() {
        let dir = tempdir().unwrap();
        let storage = storage(dir.path()).await;

        let url = storage
            .presigned_get_url(&StorageUri::new("media", "crow.jpg"), Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(url, "http://localhost:3000/media/media/crow.jpg");
    }
}
