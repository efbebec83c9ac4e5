//! Hooks for the storage and change-stream collaborators

use crate::error::{HttpAppError, ValidatedJson};
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, Json};
use birdtag_core::{ChangeEvent, ErrorMetadata, MediaRecord, StorageUri};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct ObjectCreatedRequest {
    pub bucket: String,
    pub key: String,
}

#[derive(Debug, Serialize)]
pub struct FailedNotification {
    pub email: String,
    pub tag: String,
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct DispatchResponse {
    pub sent: usize,
    pub failed: Vec<FailedNotification>,
}

/// Dispatch notifications for one externally observed record change
#[tracing::instrument(skip(state, event), fields(file_id = %event.record_id, kind = %event.kind))]
pub async fn record_changed(
    State(state): State<Arc<AppState>>,
    ValidatedJson(event): ValidatedJson<ChangeEvent>,
) -> Result<Json<DispatchResponse>, HttpAppError> {
    let report = state.dispatcher.dispatch(&event).await?;

    Ok(Json(DispatchResponse {
        sent: report.sent,
        failed: report
            .failed
            .into_iter()
            .map(|(email, tag, error)| FailedNotification {
                email,
                tag,
                code: error.error_code().to_string(),
                message: error.client_message(),
            })
            .collect(),
    }))
}

/// Ingest a newly created object; notifications follow through the change feed
#[tracing::instrument(skip(state, request), fields(bucket = %request.bucket, key = %request.key))]
pub async fn object_created(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<ObjectCreatedRequest>,
) -> Result<(StatusCode, Json<MediaRecord>), HttpAppError> {
    if request.bucket.trim().is_empty() || request.key.trim().is_empty() {
        return Err(birdtag_core::AppError::InvalidInput(
            "bucket and key are required".to_string(),
        )
        .into());
    }

    let record = state
        .ingestion
        .ingest(StorageUri::new(request.bucket, request.key))
        .await?;

    Ok((StatusCode::CREATED, Json(record)))
}
