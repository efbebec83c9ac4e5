//! Application state shared by every handler.

use birdtag_core::Config;
use birdtag_db::Repositories;
use birdtag_services::{
    AddressResolver, ChangeFeed, DeletionCascade, IngestionService, MessageBus,
    NotificationDispatcher, QueryEngine, SpeciesDetector, SubscriptionRegistry, TagMutator,
    UploadMatcher,
};
use birdtag_storage::{AddressNormalizer, Storage, ThumbnailNaming};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;

/// Backends the services are built over; production builds them from config,
/// tests hand in in-memory fakes.
#[derive(Clone)]
pub struct Collaborators {
    pub pool: Option<PgPool>,
    pub repositories: Repositories,
    pub storage: Arc<dyn Storage>,
    pub bus: Arc<dyn MessageBus>,
    pub detector: Arc<dyn SpeciesDetector>,
}

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub pool: Option<PgPool>,
    pub repositories: Repositories,
    pub storage: Arc<dyn Storage>,
    pub query: QueryEngine,
    pub mutator: TagMutator,
    pub deletion: DeletionCascade,
    pub subscriptions: SubscriptionRegistry,
    pub dispatcher: Arc<NotificationDispatcher>,
    pub ingestion: IngestionService,
    pub uploads: UploadMatcher,
}

impl AppState {
    /// Wire every service over the given collaborators. Writers publish change
    /// events onto `feed`.
    pub fn build(config: Config, parts: Collaborators, feed: ChangeFeed) -> Self {
        let Collaborators {
            pool,
            repositories,
            storage,
            bus,
            detector,
        } = parts;

        let normalizer = AddressNormalizer::new(
            storage.clone(),
            Duration::from_secs(config.signed_url_ttl_secs()),
        );
        let naming = ThumbnailNaming::new(config.thumbnail_prefix(), config.thumbnail_suffix());
        let resolver = AddressResolver::new(
            repositories.metadata.clone(),
            normalizer.clone(),
            naming.clone(),
        );
        let query = QueryEngine::new(repositories.metadata.clone(), normalizer.clone());

        let mutator = TagMutator::new(repositories.metadata.clone(), resolver.clone(), feed.clone());
        let deletion = DeletionCascade::new(repositories.metadata.clone(), storage.clone(), resolver);
        let subscriptions = SubscriptionRegistry::new(
            repositories.subscriptions.clone(),
            bus.clone(),
            config.topic_prefix(),
        );
        let dispatcher = Arc::new(NotificationDispatcher::new(
            repositories.subscriptions.clone(),
            bus,
            normalizer.clone(),
            config.topic_prefix(),
        ));
        let ingestion = IngestionService::new(
            repositories.metadata.clone(),
            storage.clone(),
            detector.clone(),
            naming,
            feed,
        );
        let uploads = UploadMatcher::new(
            detector,
            query.clone(),
            storage.clone(),
            repositories.transient_results.clone(),
            normalizer,
            config.transient_result_ttl_secs(),
        );

        Self {
            config,
            pool,
            repositories,
            storage,
            query,
            mutator,
            deletion,
            subscriptions,
            dispatcher,
            ingestion,
            uploads,
        }
    }
}
