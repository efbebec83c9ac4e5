//! In-memory fakes and fixtures for testing services without AWS or PostgreSQL
//!
//! Available to this crate's unit tests and, with the `test-helpers` feature,
//! to downstream integration tests.

pub mod fixtures;
pub mod mock_bus;
pub mod mock_detector;
pub mod mock_storage;

pub use fixtures::{audio_record, image_record, video_record, TestContext};
pub use mock_bus::RecordingMessageBus;
pub use mock_detector::StaticDetector;
pub use mock_storage::InMemoryStorage;
