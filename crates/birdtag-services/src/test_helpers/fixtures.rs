//! Record fixtures and a fully wired in-memory service context

use birdtag_core::{FileType, MediaRecord, StorageUri, Subscription, TagMap};
use birdtag_db::{
    InMemoryMetadataStore, InMemorySubscriptionStore, InMemoryTransientResultStore, MetadataStore,
    SubscriptionStore,
};
use birdtag_storage::{AddressNormalizer, Storage, ThumbnailNaming};
use std::sync::Arc;
use std::time::Duration;

use super::{InMemoryStorage, RecordingMessageBus, StaticDetector};
use crate::deletion::DeletionCascade;
use crate::feed::ChangeFeed;
use crate::ingestion::IngestionService;
use crate::mutation::TagMutator;
use crate::notification::NotificationDispatcher;
use crate::query::QueryEngine;
use crate::resolver::AddressResolver;
use crate::subscription::SubscriptionRegistry;
use crate::upload_match::UploadMatcher;

pub const TEST_BUCKET: &str = "media";
pub const TEST_TOPIC_PREFIX: &str = "notify-";
pub const TEST_SIGNED_TTL_SECS: u64 = 3600;
pub const TEST_TRANSIENT_TTL_SECS: u64 = 300;

fn tag_map(tags: &[(&str, u32)]) -> TagMap {
    tags.iter().map(|(name, count)| (name.to_string(), *count)).collect()
}

fn record(file_id: &str, file_type: FileType, tags: &[(&str, u32)]) -> MediaRecord {
    MediaRecord {
        file_id: file_id.to_string(),
        file_type,
        original_address: StorageUri::new(TEST_BUCKET, file_id),
        thumbnail_address: None,
        tags: tag_map(tags),
    }
}

/// Image stored at `s3://media/{file_id}` with its conventional thumbnail
pub fn image_record(file_id: &str, tags: &[(&str, u32)]) -> MediaRecord {
    let mut image = record(file_id, FileType::Image, tags);
    image.thumbnail_address = Some(ThumbnailNaming::default().thumbnail_for(&image.original_address));
    image
}

pub fn audio_record(file_id: &str, tags: &[(&str, u32)]) -> MediaRecord {
    record(file_id, FileType::Audio, tags)
}

pub fn video_record(file_id: &str, tags: &[(&str, u32)]) -> MediaRecord {
    record(file_id, FileType::Video, tags)
}

/// In-memory stores, storage, bus and detector plus constructors for every service
pub struct TestContext {
    pub metadata: Arc<InMemoryMetadataStore>,
    pub subscriptions: Arc<InMemorySubscriptionStore>,
    pub transient: Arc<InMemoryTransientResultStore>,
    pub storage: Arc<InMemoryStorage>,
    pub bus: Arc<RecordingMessageBus>,
    pub detector: Arc<StaticDetector>,
    pub normalizer: AddressNormalizer,
    pub naming: ThumbnailNaming,
}

impl TestContext {
    pub fn new() -> Self {
        let storage = Arc::new(InMemoryStorage::new());
        let normalizer = AddressNormalizer::new(
            storage.clone() as Arc<dyn Storage>,
            Duration::from_secs(TEST_SIGNED_TTL_SECS),
        );

        Self {
            metadata: Arc::new(InMemoryMetadataStore::new()),
            subscriptions: Arc::new(InMemorySubscriptionStore::new()),
            transient: Arc::new(InMemoryTransientResultStore::new()),
            storage,
            bus: Arc::new(RecordingMessageBus::new()),
            detector: Arc::new(StaticDetector::new()),
            normalizer,
            naming: ThumbnailNaming::default(),
        }
    }

    pub async fn insert(&self, record: MediaRecord) {
        self.metadata.put(&record).await.unwrap();
    }

    /// Insert the record and create its original and thumbnail objects
    pub async fn insert_with_objects(&self, record: MediaRecord) {
        self.storage.put_object(&record.original_address).await;
        if let Some(ref thumbnail) = record.thumbnail_address {
            self.storage.put_object(thumbnail).await;
        }
        self.insert(record).await;
    }

    pub async fn subscribe_direct(&self, subscription: Subscription) {
        self.subscriptions.put(&subscription).await.unwrap();
    }

    pub fn resolver(&self) -> AddressResolver {
        AddressResolver::new(self.metadata.clone(), self.normalizer.clone(), self.naming.clone())
    }

    pub fn query_engine(&self) -> QueryEngine {
        QueryEngine::new(self.metadata.clone(), self.normalizer.clone())
    }

    pub fn mutator(&self, feed: ChangeFeed) -> TagMutator {
        TagMutator::new(self.metadata.clone(), self.resolver(), feed)
    }

    pub fn deletion(&self) -> DeletionCascade {
        DeletionCascade::new(self.metadata.clone(), self.storage.clone(), self.resolver())
    }

    pub fn registry(&self) -> SubscriptionRegistry {
        SubscriptionRegistry::new(self.subscriptions.clone(), self.bus.clone(), TEST_TOPIC_PREFIX)
    }

    pub fn dispatcher(&self) -> NotificationDispatcher {
        NotificationDispatcher::new(
            self.subscriptions.clone(),
            self.bus.clone(),
            self.normalizer.clone(),
            TEST_TOPIC_PREFIX,
        )
    }

    pub fn ingestion(&self, feed: ChangeFeed) -> IngestionService {
        IngestionService::new(
            self.metadata.clone(),
            self.storage.clone(),
            self.detector.clone(),
            self.naming.clone(),
            feed,
        )
    }

    pub fn upload_matcher(&self) -> UploadMatcher {
        UploadMatcher::new(
            self.detector.clone(),
            self.query_engine(),
            self.storage.clone(),
            self.transient.clone(),
            self.normalizer.clone(),
            TEST_TRANSIENT_TTL_SECS,
        )
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}
