//! Media listing, cascading deletion and thumbnail reverse lookup

use crate::error::{BatchItemError, HttpAppError, ValidatedJson};
use crate::state::AppState;
use axum::{extract::State, Json};
use birdtag_core::AppError;
use birdtag_services::{DeletionReport, MediaListing};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct DeleteByAddressesRequest {
    #[serde(default, alias = "url")]
    pub urls: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteByIdsRequest {
    #[serde(default, alias = "ids")]
    pub file_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct DeletionResponse {
    pub deleted: Vec<String>,
    pub errors: Vec<BatchItemError>,
}

impl From<DeletionReport> for DeletionResponse {
    fn from(report: DeletionReport) -> Self {
        Self {
            errors: report.errors.iter().map(BatchItemError::from).collect(),
            deleted: report.deleted,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct OriginalUrlRequest {
    #[serde(alias = "url")]
    pub thumbnail_url: String,
}

#[derive(Debug, Serialize)]
pub struct OriginalUrlResponse {
    pub original_url: String,
}

#[derive(Debug, Serialize)]
pub struct MediaListResponse {
    pub media: Vec<MediaListing>,
}

pub async fn list_media(
    State(state): State<Arc<AppState>>,
) -> Result<Json<MediaListResponse>, HttpAppError> {
    let media = state.query.list_all().await?;
    Ok(Json(MediaListResponse { media }))
}

#[tracing::instrument(skip(state, request), fields(address_count = request.urls.len()))]
pub async fn delete_by_addresses(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<DeleteByAddressesRequest>,
) -> Result<Json<DeletionResponse>, HttpAppError> {
    if request.urls.is_empty() {
        return Err(AppError::InvalidInput("At least one address is required".to_string()).into());
    }

    let report = state.deletion.delete_by_external_addresses(&request.urls).await;
    Ok(Json(report.into()))
}

#[tracing::instrument(skip(state, request), fields(id_count = request.file_ids.len()))]
pub async fn delete_by_ids(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<DeleteByIdsRequest>,
) -> Result<Json<DeletionResponse>, HttpAppError> {
    if request.file_ids.is_empty() {
        return Err(AppError::InvalidInput("At least one file id is required".to_string()).into());
    }

    let report = state.deletion.delete_by_ids(&request.file_ids).await;
    Ok(Json(report.into()))
}

pub async fn original_url(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<OriginalUrlRequest>,
) -> Result<Json<OriginalUrlResponse>, HttpAppError> {
    let original_url = state
        .query
        .original_url_for_thumbnail(&request.thumbnail_url)
        .await?;
    Ok(Json(OriginalUrlResponse { original_url }))
}
