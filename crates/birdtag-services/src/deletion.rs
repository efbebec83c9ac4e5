//! Cascading deletion of media assets
//!
//! For each id, in order: delete the original object, delete the thumbnail
//! object if any, then delete the metadata record. Object deletion is best
//! effort; a failure there is reported but does not keep the record alive.

use std::sync::Arc;

use birdtag_core::AppError;
use birdtag_db::MetadataStore;
use birdtag_storage::Storage;

use crate::report::{DeletionReport, ItemFailure};
use crate::resolver::AddressResolver;

#[derive(Clone)]
pub struct DeletionCascade {
    metadata: Arc<dyn MetadataStore>,
    storage: Arc<dyn Storage>,
    resolver: AddressResolver,
}

impl DeletionCascade {
    pub fn new(
        metadata: Arc<dyn MetadataStore>,
        storage: Arc<dyn Storage>,
        resolver: AddressResolver,
    ) -> Self {
        Self {
            metadata,
            storage,
            resolver,
        }
    }

    /// Delete each id sequentially, isolating failures per id.
    #[tracing::instrument(skip(self, file_ids), fields(id_count = file_ids.len()))]
    pub async fn delete_by_ids(&self, file_ids: &[String]) -> DeletionReport {
        let mut report = DeletionReport::default();

        for file_id in file_ids {
            self.delete_one(file_id, file_id, &mut report).await;
        }

        tracing::info!(
            deleted = report.deleted.len(),
            failed = report.errors.len(),
            "Deletion batch finished"
        );

        report
    }

    /// Resolve each address to its record and delete it. Unresolvable addresses
    /// are reported under the address the caller sent.
    #[tracing::instrument(skip(self, addresses), fields(address_count = addresses.len()))]
    pub async fn delete_by_external_addresses(&self, addresses: &[String]) -> DeletionReport {
        let mut report = DeletionReport::default();

        for address in addresses {
            match self.resolver.resolve_file_id(address).await {
                Ok(file_id) => self.delete_one(&file_id, address, &mut report).await,
                Err(e) => {
                    tracing::warn!(error = %e, address = %address, "Could not resolve address for deletion");
                    report.errors.push(ItemFailure::new(address.clone(), e));
                }
            }
        }

        report
    }

    async fn delete_one(&self, file_id: &str, item: &str, report: &mut DeletionReport) {
        let record = match self.metadata.get(file_id).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                report.errors.push(ItemFailure::new(
                    item,
                    AppError::NotFound(format!("File {} not found", file_id)),
                ));
                return;
            }
            Err(e) => {
                report.errors.push(ItemFailure::new(item, e));
                return;
            }
        };

        let mut object_failures = Vec::new();

        if let Err(e) = self.storage.delete(&record.original_address).await {
            tracing::warn!(error = %e, file_id = %file_id, uri = %record.original_address, "Failed to delete original object");
            object_failures.push(format!("original {}: {}", record.original_address, e));
        }

        if let Some(ref thumbnail) = record.thumbnail_address {
            if let Err(e) = self.storage.delete(thumbnail).await {
                tracing::warn!(error = %e, file_id = %file_id, uri = %thumbnail, "Failed to delete thumbnail object");
                object_failures.push(format!("thumbnail {}: {}", thumbnail, e));
            }
        }

        match self.metadata.delete(file_id).await {
            Ok(()) => {
                tracing::info!(file_id = %file_id, "Media record deleted");
                report.deleted.push(item.to_string());
            }
            Err(e) => {
                tracing::error!(error = %e, file_id = %file_id, "Failed to delete media record");
                report.errors.push(ItemFailure::new(item, e));
            }
        }

        if !object_failures.is_empty() {
            report.errors.push(ItemFailure::new(
                item,
                AppError::PartialDeletionFailure(object_failures.join("; ")),
            ));
        }
    }
}
