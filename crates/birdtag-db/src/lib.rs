//! Birdtag persistence layer
//!
//! Repository traits for media records, subscriptions and transient
//! upload-match results, with PostgreSQL (sqlx) and in-memory implementations.

pub mod db;

pub use db::{
    create_repositories, InMemoryMetadataStore, InMemorySubscriptionStore,
    InMemoryTransientResultStore, MetadataStore, PostgresMetadataStore,
    PostgresSubscriptionStore, PostgresTransientResultStore, Repositories, SubscriptionStore,
    TransientResultStore,
};
