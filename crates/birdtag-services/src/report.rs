//! Per-item outcomes of batch operations.

use birdtag_core::AppError;

/// One failed item of a batch, keyed by the caller's input (file id or address)
#[derive(Debug)]
pub struct ItemFailure {
    pub item: String,
    pub error: AppError,
}

impl ItemFailure {
    pub fn new(item: impl Into<String>, error: AppError) -> Self {
        Self {
            item: item.into(),
            error,
        }
    }
}

/// Result of a cascading deletion batch.
///
/// An id is listed in `deleted` iff its metadata record was removed. Object
/// deletions that failed along the way are still reported in `errors`.
#[derive(Debug, Default)]
pub struct DeletionReport {
    pub deleted: Vec<String>,
    pub errors: Vec<ItemFailure>,
}

/// Result of applying one tag operation to many addresses
#[derive(Debug, Default)]
pub struct MutationReport {
    pub updated: Vec<String>,
    pub errors: Vec<ItemFailure>,
}
