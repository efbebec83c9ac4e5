//! Storage abstraction trait
//!
//! This module defines the Storage trait that all object storage backends implement.

use crate::address::PublicEndpoint;
use crate::StorageBackend;
use async_trait::async_trait;
use birdtag_core::{AppError, StorageUri};
use std::time::Duration;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Signing failed: {0}")]
    SigningFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::SigningFailed(msg) => AppError::SigningError(msg),
            StorageError::NotFound(msg) => AppError::NotFound(msg),
            StorageError::InvalidKey(msg) => AppError::MalformedAddress(msg),
            other => AppError::Storage(other.to_string()),
        }
    }
}

/// Storage abstraction trait
///
/// Objects are addressed by `StorageUri` so a single backend instance can serve
/// any number of buckets.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Delete an object. Deleting a missing object succeeds.
    async fn delete(&self, location: &StorageUri) -> StorageResult<()>;

    /// Check if an object exists
    async fn exists(&self, location: &StorageUri) -> StorageResult<bool>;

    /// Generate a time-limited GET URL for the object
    ///
    /// A fresh URL is produced on every call; callers must not cache it past `expires_in`.
    async fn presigned_get_url(
        &self,
        location: &StorageUri,
        expires_in: Duration,
    ) -> StorageResult<String>;

    /// Where non-expiring display addresses for this backend point
    fn public_endpoint(&self) -> &PublicEndpoint;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}
