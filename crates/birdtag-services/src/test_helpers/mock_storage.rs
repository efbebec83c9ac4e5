//! In-memory object storage
//!
//! Tracks which objects exist and can be told to fail deletes or signing.

use async_trait::async_trait;
use birdtag_core::StorageUri;
use birdtag_storage::{PublicEndpoint, Storage, StorageBackend, StorageError, StorageResult};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub struct InMemoryStorage {
    objects: Mutex<HashMap<StorageUri, Vec<u8>>>,
    failing_deletes: Mutex<HashSet<StorageUri>>,
    fail_signing: AtomicBool,
    endpoint: PublicEndpoint,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self {
            objects: Mutex::new(HashMap::new()),
            failing_deletes: Mutex::new(HashSet::new()),
            fail_signing: AtomicBool::new(false),
            endpoint: PublicEndpoint::Aws {
                region: "us-east-1".to_string(),
            },
        }
    }

    /// Create an empty object at `location`
    pub async fn put_object(&self, location: &StorageUri) {
        self.objects
            .lock()
            .unwrap()
            .insert(location.clone(), Vec::new());
    }

    pub fn contains(&self, location: &StorageUri) -> bool {
        self.objects.lock().unwrap().contains_key(location)
    }

    /// Make every delete of `location` fail
    pub fn fail_deletes_for(&self, location: StorageUri) {
        self.failing_deletes.lock().unwrap().insert(location);
    }

    pub fn set_fail_signing(&self, fail: bool) {
        self.fail_signing.store(fail, Ordering::SeqCst);
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn delete(&self, location: &StorageUri) -> StorageResult<()> {
        if self.failing_deletes.lock().unwrap().contains(location) {
            return Err(StorageError::DeleteFailed(format!(
                "Injected delete failure for {}",
                location
            )));
        }
        self.objects.lock().unwrap().remove(location);
        Ok(())
    }

    async fn exists(&self, location: &StorageUri) -> StorageResult<bool> {
        Ok(self.contains(location))
    }

    async fn presigned_get_url(
        &self,
        location: &StorageUri,
        expires_in: Duration,
    ) -> StorageResult<String> {
        if self.fail_signing.load(Ordering::SeqCst) {
            return Err(StorageError::SigningFailed("Injected signing failure".to_string()));
        }
        Ok(format!(
            "{}?X-Amz-Expires={}&X-Amz-Signature=test",
            self.endpoint.format(location),
            expires_in.as_secs()
        ))
    }

    fn public_endpoint(&self) -> &PublicEndpoint {
        &self.endpoint
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }
}
