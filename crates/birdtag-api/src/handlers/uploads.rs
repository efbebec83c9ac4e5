//! Upload-and-match: start a match for an uploaded sample, then poll for it

use crate::error::{HttpAppError, ValidatedJson};
use crate::state::AppState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use birdtag_core::{AppError, StorageUri};
use birdtag_services::UploadMatchResult;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct StartMatchRequest {
    pub bucket: String,
    pub key: String,
}

#[derive(Debug, Serialize)]
pub struct StartMatchResponse {
    pub file_key: String,
    pub status: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct PollParams {
    pub key: String,
}

/// Accept the sample and run detection in the background
pub async fn start_match(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<StartMatchRequest>,
) -> Result<(StatusCode, Json<StartMatchResponse>), HttpAppError> {
    if request.bucket.trim().is_empty() || request.key.trim().is_empty() {
        return Err(AppError::InvalidInput("bucket and key are required".to_string()).into());
    }

    let location = StorageUri::new(request.bucket, request.key);
    let file_key = location.key.clone();
    let uploads = state.uploads.clone();

    tokio::spawn(async move {
        if let Err(e) = uploads.match_upload(location).await {
            tracing::error!(error = %e, "Upload match failed");
        }
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(StartMatchResponse {
            file_key,
            status: "processing",
        }),
    ))
}

/// `404 Processing` until the result exists
pub async fn poll_result(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PollParams>,
) -> Result<Json<UploadMatchResult>, HttpAppError> {
    let result = state.uploads.poll(&params.key).await?;
    Ok(Json(result))
}
