//! Database repositories for the data access layer
//!
//! Each repository owns one table and exposes it through a trait so services can
//! run against PostgreSQL in production and in-memory stores in tests and local
//! development.

pub mod factory;
pub mod media_record;
pub mod memory;
pub mod subscription;
pub mod transient;

pub use factory::{create_repositories, Repositories};
pub use media_record::{MetadataStore, PostgresMetadataStore};
pub use memory::{InMemoryMetadataStore, InMemorySubscriptionStore, InMemoryTransientResultStore};
pub use subscription::{PostgresSubscriptionStore, SubscriptionStore};
pub use transient::{PostgresTransientResultStore, TransientResultStore};
