//! Tag mutation engine
//!
//! Mutations are read-modify-write against the metadata store with no
//! compare-and-swap: concurrent writers to the same record race and the last
//! write wins.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::sync::Arc;

use birdtag_core::models::tags::{clear_tags, merge_deltas};
use birdtag_core::{AppError, ChangeEvent, ChangeKind, MediaRecord, TagDeltas};
use birdtag_db::MetadataStore;

use crate::feed::ChangeFeed;
use crate::report::{ItemFailure, MutationReport};
use crate::resolver::AddressResolver;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagOperation {
    /// Add each signed delta to the current count, then drop counts at or below zero
    Merge,
    /// Remove the listed tags whatever their count
    Clear,
}

impl Display for TagOperation {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            TagOperation::Merge => write!(f, "merge"),
            TagOperation::Clear => write!(f, "clear"),
        }
    }
}

#[derive(Clone)]
pub struct TagMutator {
    metadata: Arc<dyn MetadataStore>,
    resolver: AddressResolver,
    feed: ChangeFeed,
}

impl TagMutator {
    pub fn new(metadata: Arc<dyn MetadataStore>, resolver: AddressResolver, feed: ChangeFeed) -> Self {
        Self {
            metadata,
            resolver,
            feed,
        }
    }

    /// Apply one operation to one record and emit a MODIFY change event.
    #[tracing::instrument(skip(self, deltas), fields(file_id = %file_id, operation = %operation, tag_count = deltas.len()))]
    pub async fn apply(
        &self,
        file_id: &str,
        operation: TagOperation,
        deltas: &TagDeltas,
    ) -> Result<MediaRecord, AppError> {
        let record = self
            .metadata
            .get(file_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("File {} not found", file_id)))?;

        let new_tags = match operation {
            TagOperation::Merge => merge_deltas(&record.tags, deltas),
            TagOperation::Clear => clear_tags(&record.tags, deltas.keys().map(String::as_str)),
        };

        let updated = self.metadata.update_tags(file_id, &new_tags).await?;

        tracing::info!(
            file_id = %file_id,
            tags_before = record.tags.len(),
            tags_after = updated.tags.len(),
            "Tags updated"
        );

        self.feed
            .publish(ChangeEvent::from_record(ChangeKind::Modify, &updated))
            .await;

        Ok(updated)
    }

    /// Apply the same operation to every address; failures are isolated per address.
    #[tracing::instrument(skip(self, addresses, deltas), fields(address_count = addresses.len(), operation = %operation))]
    pub async fn apply_many(
        &self,
        addresses: &[String],
        operation: TagOperation,
        deltas: &TagDeltas,
    ) -> MutationReport {
        let mut report = MutationReport::default();

        for address in addresses {
            let outcome = match self.resolver.resolve_file_id(address).await {
                Ok(file_id) => self.apply(&file_id, operation, deltas).await.map(|_| ()),
                Err(e) => Err(e),
            };

            match outcome {
                Ok(()) => report.updated.push(address.clone()),
                Err(e) => {
                    tracing::warn!(error = %e, address = %address, "Tag mutation failed");
                    report.errors.push(ItemFailure::new(address.clone(), e));
                }
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::change_feed;
    use crate::test_helpers::{image_record, TestContext};

    fn deltas(pairs: &[(&str, i64)]) -> TagDeltas {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[tokio::test]
    async fn test_merge_then_decrement_to_removal() {
        let ctx = TestContext::new();
        ctx.insert(image_record("a.jpg", &[])).await;
        let mutator = ctx.mutator(ChangeFeed::disconnected());

        let rec = mutator
            .apply("a.jpg", TagOperation::Merge, &deltas(&[("crow", 2)]))
            .await
            .unwrap();
        assert_eq!(rec.tags.get("crow"), Some(&2));

        let rec = mutator
            .apply("a.jpg", TagOperation::Merge, &deltas(&[("crow", -1)]))
            .await
            .unwrap();
        assert_eq!(rec.tags.get("crow"), Some(&1));

        let rec = mutator
            .apply("a.jpg", TagOperation::Merge, &deltas(&[("crow", -1)]))
            .await
            .unwrap();
        assert!(!rec.tags.contains_key("crow"));

        let stored = ctx.metadata.get("a.jpg").await.unwrap().unwrap();
        assert!(stored.tags.is_empty());
    }

    #[tokio::test]
    async fn test_clear_removes_keys() {
        let ctx = TestContext::new();
        ctx.insert(image_record("a.jpg", &[("crow", 7), ("myna", 1)])).await;
        let mutator = ctx.mutator(ChangeFeed::disconnected());

        let rec = mutator
            .apply("a.jpg", TagOperation::Clear, &deltas(&[("crow", 1)]))
            .await
            .unwrap();
        assert!(!rec.tags.contains_key("crow"));
        assert_eq!(rec.tags.get("myna"), Some(&1));
    }

    #[tokio::test]
    async fn test_missing_record_is_not_found() {
        let ctx = TestContext::new();
        let err = ctx
            .mutator(ChangeFeed::disconnected())
            .apply("nope.jpg", TagOperation::Merge, &deltas(&[("crow", 1)]))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_apply_emits_modify_event() {
        let ctx = TestContext::new();
        ctx.insert(image_record("a.jpg", &[])).await;
        let (feed, mut rx) = change_feed(8);

        ctx.mutator(feed)
            .apply("a.jpg", TagOperation::Merge, &deltas(&[("crow", 1)]))
            .await
            .unwrap();

        let event = rx.recv().await.unwrap();
        assert_eq!(event.kind, ChangeKind::Modify);
        assert_eq!(event.record_id, "a.jpg");
        assert_eq!(event.tags.get("crow"), Some(&1));
    }

    #[tokio::test]
    async fn test_apply_many_isolates_failures() {
        let ctx = TestContext::new();
        ctx.insert(image_record("a.jpg", &[])).await;
        let mutator = ctx.mutator(ChangeFeed::disconnected());

        let addresses = vec![
            "https://media.s3.us-east-1.amazonaws.com/thumbnails/a-thumb.jpg".to_string(),
            "s3://media/missing.jpg".to_string(),
            "not an address".to_string(),
        ];
        let report = mutator
            .apply_many(&addresses, TagOperation::Merge, &deltas(&[("crow", 1)]))
            .await;

        assert_eq!(report.updated, vec![addresses[0].clone()]);
        assert_eq!(report.errors.len(), 2);
        assert!(matches!(report.errors[0].error, AppError::NotFound(_)));
        assert!(matches!(report.errors[1].error, AppError::MalformedAddress(_)));
    }
}
