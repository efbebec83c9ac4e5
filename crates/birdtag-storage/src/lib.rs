//! Birdtag Storage Library
//!
//! Object storage abstraction for Birdtag: the `Storage` trait, S3 and local
//! filesystem backends, and the `AddressNormalizer` that converts internal
//! `s3://bucket/key` URIs to and from externally consumable addresses.
//!
//! # Object layout
//!
//! Every object is addressed by `(bucket, key)`. The local backend maps this to
//! `{base_path}/{bucket}/{key}`. Thumbnails live in the same bucket as their
//! original under `{prefix}{stem}{suffix}.jpg` (see `keys`).

pub mod address;
pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use address::{AddressMode, AddressNormalizer, PublicEndpoint};
pub use birdtag_core::StorageBackend;
pub use factory::create_storage;
pub use keys::ThumbnailNaming;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{Storage, StorageError, StorageResult};
