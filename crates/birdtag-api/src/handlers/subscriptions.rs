use crate::error::{HttpAppError, ValidatedJson};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct SubscribeRequest {
    pub email: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct SubscriptionResponse {
    pub email: String,
    pub tags: BTreeSet<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed_topics: Vec<String>,
}

pub async fn subscribe(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<SubscribeRequest>,
) -> Result<Json<SubscriptionResponse>, HttpAppError> {
    let outcome = state
        .subscriptions
        .subscribe(&request.email, &request.tags)
        .await?;

    Ok(Json(SubscriptionResponse {
        email: outcome.subscription.email,
        tags: outcome.subscription.tags,
        failed_topics: outcome.failed_topics,
    }))
}

pub async fn get_subscription(
    State(state): State<Arc<AppState>>,
    Path(email): Path<String>,
) -> Result<Json<SubscriptionResponse>, HttpAppError> {
    let tags = state.subscriptions.get(&email).await?;

    Ok(Json(SubscriptionResponse {
        email,
        tags,
        failed_topics: Vec::new(),
    }))
}
