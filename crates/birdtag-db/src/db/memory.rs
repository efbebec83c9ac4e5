//! In-memory repositories
//!
//! Used with `METADATA_BACKEND=memory` and by tests. State lives behind a
//! `tokio::sync::RwLock`; each operation is atomic, scans are snapshots.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use birdtag_core::{AppError, MediaRecord, Subscription, TagMap, TransientQueryResult};
use chrono::Utc;
use tokio::sync::RwLock;

use super::media_record::MetadataStore;
use super::subscription::SubscriptionStore;
use super::transient::TransientResultStore;

#[derive(Clone, Default)]
pub struct InMemoryMetadataStore {
    records: Arc<RwLock<BTreeMap<String, MediaRecord>>>,
}

impl InMemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MetadataStore for InMemoryMetadataStore {
    async fn get(&self, file_id: &str) -> Result<Option<MediaRecord>, AppError> {
        Ok(self.records.read().await.get(file_id).cloned())
    }

    async fn put(&self, record: &MediaRecord) -> Result<(), AppError> {
        self.records
            .write()
            .await
            .insert(record.file_id.clone(), record.clone());
        Ok(())
    }

    async fn update_tags(&self, file_id: &str, tags: &TagMap) -> Result<MediaRecord, AppError> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(file_id)
            .ok_or_else(|| AppError::NotFound(format!("File {} not found", file_id)))?;
        record.tags = tags.clone();
        Ok(record.clone())
    }

    async fn delete(&self, file_id: &str) -> Result<(), AppError> {
        self.records
            .write()
            .await
            .remove(file_id)
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound(format!("File {} not found", file_id)))
    }

    async fn scan(&self) -> Result<Vec<MediaRecord>, AppError> {
        Ok(self.records.read().await.values().cloned().collect())
    }
}

#[derive(Clone, Default)]
pub struct InMemorySubscriptionStore {
    subscriptions: Arc<RwLock<BTreeMap<String, Subscription>>>,
}

impl InMemorySubscriptionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SubscriptionStore for InMemorySubscriptionStore {
    async fn put(&self, subscription: &Subscription) -> Result<(), AppError> {
        self.subscriptions
            .write()
            .await
            .insert(subscription.email.clone(), subscription.clone());
        Ok(())
    }

    async fn get(&self, email: &str) -> Result<Option<Subscription>, AppError> {
        Ok(self.subscriptions.read().await.get(email).cloned())
    }

    async fn all(&self) -> Result<Vec<Subscription>, AppError> {
        Ok(self.subscriptions.read().await.values().cloned().collect())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryTransientResultStore {
    results: Arc<RwLock<HashMap<String, TransientQueryResult>>>,
}

impl InMemoryTransientResultStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TransientResultStore for InMemoryTransientResultStore {
    async fn put(&self, result: &TransientQueryResult) -> Result<(), AppError> {
        self.results
            .write()
            .await
            .insert(result.file_key.clone(), result.clone());
        Ok(())
    }

    async fn get(&self, file_key: &str) -> Result<Option<TransientQueryResult>, AppError> {
        Ok(self
            .results
            .read()
            .await
            .get(file_key)
            .filter(|result| !result.is_expired())
            .cloned())
    }

    async fn purge_expired(&self) -> Result<u64, AppError> {
        let now = Utc::now();
        let mut results = self.results.write().await;
        let before = results.len();
        results.retain(|_, result| !result.is_expired_at(now));
        Ok((before - results.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use birdtag_core::{FileType, StorageUri};
    use chrono::Duration;

    fn record(file_id: &str, tags: &[(&str, u32)]) -> MediaRecord {
        MediaRecord {
            file_id: file_id.to_string(),
            file_type: FileType::Image,
            original_address: StorageUri::new("media", file_id),
            thumbnail_address: Some(StorageUri::new("media", format!("thumbnails/{}", file_id))),
            tags: tags.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
        }
    }

    #[tokio::test]
    async fn test_metadata_store_crud() {
        let store = InMemoryMetadataStore::new();
        store.put(&record("crow.jpg", &[("crow", 1)])).await.unwrap();

        let fetched = store.get("crow.jpg").await.unwrap().unwrap();
        assert_eq!(fetched.tags.get("crow"), Some(&1));

        let new_tags: TagMap = [("crow".to_string(), 5)].into_iter().collect();
        let updated = store.update_tags("crow.jpg", &new_tags).await.unwrap();
        assert_eq!(updated.tags, new_tags);

        store.delete("crow.jpg").await.unwrap();
        assert!(store.get("crow.jpg").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_record_is_not_found() {
        let store = InMemoryMetadataStore::new();
        let err = store.update_tags("nope.jpg", &TagMap::new()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        let err = store.delete("nope.jpg").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_find_by_address_matches_thumbnail() {
        let store = InMemoryMetadataStore::new();
        store.put(&record("crow.jpg", &[])).await.unwrap();
        store.put(&record("myna.jpg", &[])).await.unwrap();

        let found = store
            .find_by_address(&StorageUri::new("media", "thumbnails/myna.jpg"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.file_id, "myna.jpg");
    }

    #[tokio::test]
    async fn test_subscription_put_replaces() {
        let store = InMemorySubscriptionStore::new();
        store
            .put(&Subscription::new("a@example.com", ["crow", "myna"]))
            .await
            .unwrap();
        store
            .put(&Subscription::new("a@example.com", ["eagle"]))
            .await
            .unwrap();

        let sub = store.get("a@example.com").await.unwrap().unwrap();
        assert_eq!(sub.tags.len(), 1);
        assert!(sub.tags.contains("eagle"));
        assert_eq!(store.all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_transient_result_expiry() {
        let store = InMemoryTransientResultStore::new();
        let live = TransientQueryResult::new("uploads/live.jpg", TagMap::new(), vec![], 300);
        let mut expired = TransientQueryResult::new("uploads/old.jpg", TagMap::new(), vec![], 300);
        expired.expires_at = Utc::now() - Duration::seconds(1);

        store.put(&live).await.unwrap();
        store.put(&expired).await.unwrap();

        assert!(store.get("uploads/live.jpg").await.unwrap().is_some());
        assert!(store.get("uploads/old.jpg").await.unwrap().is_none());
        assert_eq!(store.purge_expired().await.unwrap(), 1);
    }
}
