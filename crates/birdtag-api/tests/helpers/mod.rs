//! Test helpers: build AppState and router over in-memory backends.
//!
//! Run from workspace root: `cargo test -p birdtag-api`.

#![allow(dead_code)]

use axum_test::TestServer;
use birdtag_api::constants;
use birdtag_api::setup::routes;
use birdtag_api::{AppState, Collaborators};
use birdtag_core::{
    BaseConfig, BirdTagConfig, Config, MediaRecord, MessagingBackend, MetadataBackend,
    StorageBackend,
};
use birdtag_db::{
    InMemoryMetadataStore, InMemorySubscriptionStore, InMemoryTransientResultStore, MetadataStore,
    Repositories,
};
use birdtag_services::test_helpers::{InMemoryStorage, RecordingMessageBus, StaticDetector};
use birdtag_services::{change_feed, NotificationWorker};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

pub use birdtag_services::test_helpers::{audio_record, image_record, video_record};

/// API path prefix for tests (e.g. `/api/v0`).
pub fn api_path(path: &str) -> String {
    format!("{}{}", constants::API_PREFIX, path)
}

pub fn test_config() -> Config {
    Config(Box::new(BirdTagConfig {
        base: BaseConfig {
            server_port: 0,
            cors_origins: vec!["*".to_string()],
            db_max_connections: 1,
            db_timeout_seconds: 1,
            environment: "test".to_string(),
        },
        metadata_backend: MetadataBackend::Memory,
        database_url: None,
        storage_backend: StorageBackend::S3,
        s3_region: Some("us-east-1".to_string()),
        s3_endpoint: None,
        aws_region: None,
        local_storage_path: None,
        local_storage_base_url: None,
        signed_url_ttl_secs: 3600,
        thumbnail_prefix: "thumbnails/".to_string(),
        thumbnail_suffix: "-thumb".to_string(),
        messaging_backend: MessagingBackend::Log,
        aws_account_id: None,
        topic_prefix: "notify-".to_string(),
        change_feed_capacity: 64,
        detector_url: None,
        detector_timeout_secs: 5,
        transient_result_ttl_secs: 300,
    }))
}

/// Test application: server plus handles on every fake behind it.
pub struct TestApp {
    pub server: TestServer,
    pub state: Arc<AppState>,
    pub metadata: Arc<InMemoryMetadataStore>,
    pub storage: Arc<InMemoryStorage>,
    pub bus: Arc<RecordingMessageBus>,
    pub detector: Arc<StaticDetector>,
    _worker: JoinHandle<()>,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
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
}

pub async fn setup_test_app() -> TestApp {
    let config = test_config();

    let metadata = Arc::new(InMemoryMetadataStore::new());
    let storage = Arc::new(InMemoryStorage::new());
    let bus = Arc::new(RecordingMessageBus::new());
    let detector = Arc::new(StaticDetector::new());

    let repositories = Repositories {
        metadata: metadata.clone(),
        subscriptions: Arc::new(InMemorySubscriptionStore::new()),
        transient_results: Arc::new(InMemoryTransientResultStore::new()),
    };

    let (feed, feed_rx) = change_feed(config.change_feed_capacity());
    let state = Arc::new(AppState::build(
        config.clone(),
        Collaborators {
            pool: None,
            repositories,
            storage: storage.clone(),
            bus: bus.clone(),
            detector: detector.clone(),
        },
        feed,
    ));
    let worker = NotificationWorker::new(state.dispatcher.clone()).start(feed_rx);

    let router = routes::setup_routes(&config, state.clone()).unwrap();
    let server = TestServer::new(router).unwrap();

    TestApp {
        server,
        state,
        metadata,
        storage,
        bus,
        detector,
        _worker: worker,
    }
}

/// Poll `check` until it yields a value or two seconds pass.
pub async fn eventually<T, F, Fut>(mut check: F) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    for _ in 0..100 {
        if let Some(value) = check().await {
            return Some(value);
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    None
}
