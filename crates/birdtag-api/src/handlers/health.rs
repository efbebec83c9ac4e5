//! Health check handler

use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use std::sync::Arc;
use std::time::Duration;

const CHECK_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(serde::Serialize)]
struct HealthCheckResponse {
    status: &'static str,
    metadata_store: String,
    storage: String,
}

pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let metadata_store = match state.pool {
        Some(ref pool) => {
            let check = sqlx::query("SELECT 1").execute(pool);
            match tokio::time::timeout(CHECK_TIMEOUT, check).await {
                Ok(Ok(_)) => "healthy".to_string(),
                Ok(Err(e)) => format!("unhealthy: {}", e),
                Err(_) => "timeout".to_string(),
            }
        }
        None => "healthy (in-memory)".to_string(),
    };

    let healthy = metadata_store.starts_with("healthy");
    let response = HealthCheckResponse {
        status: if healthy { "healthy" } else { "unhealthy" },
        metadata_store,
        storage: state.storage.backend_type().to_string(),
    };

    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(response))
}
