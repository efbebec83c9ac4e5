//! Birdtag Services Layer
//!
//! Business services over the tag index: querying, tag mutation, cascading
//! deletion, subscriptions and notification fan-out, ingestion of new objects and
//! the upload-and-match flow. HTTP handling stays in birdtag-api; everything here
//! works against the repository, storage, message bus and detector traits.

pub mod cleanup;
pub mod deletion;
pub mod detector;
pub mod feed;
pub mod ingestion;
pub mod mutation;
pub mod notification;
pub mod query;
pub mod report;
pub mod resolver;
pub mod subscription;
pub mod upload_match;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use cleanup::TransientResultCleanup;
pub use deletion::DeletionCascade;
#[cfg(feature = "detector-http")]
pub use detector::HttpSpeciesDetector;
pub use detector::{SpeciesDetector, UnconfiguredDetector};
pub use feed::{change_feed, ChangeFeed, NotificationWorker};
pub use ingestion::IngestionService;
pub use mutation::{TagMutator, TagOperation};
#[cfg(feature = "messaging-sns")]
pub use notification::SnsMessageBus;
pub use notification::{
    DispatchReport, LogMessageBus, MessageBus, Notification, NotificationDispatcher,
};
pub use query::{MediaListing, QueryEngine};
pub use report::{DeletionReport, ItemFailure, MutationReport};
pub use resolver::AddressResolver;
pub use subscription::{SubscribeOutcome, SubscriptionRegistry};
pub use upload_match::{UploadMatchResult, UploadMatcher};
