//! Birdtag Core Library
//!
//! This crate provides the domain models, error types and configuration shared by
//! every Birdtag component: media records and their tag maps, subscriptions,
//! transient upload-match results, and the `s3://bucket/key` storage URI type.

pub mod config;
pub mod error;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use config::{BaseConfig, BirdTagConfig, Config, MessagingBackend, MetadataBackend};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use models::{
    ChangeEvent, ChangeKind, FileType, MediaRecord, StorageUri, Subscription, TagDeltas, TagMap,
    TransientQueryResult,
};
pub use storage_types::StorageBackend;
