pub mod events;
pub mod health;
pub mod media;
pub mod query;
pub mod subscriptions;
pub mod uploads;

use crate::error::HttpAppError;
use axum::http::{Method, Uri};
use birdtag_core::AppError;

pub async fn method_not_allowed(method: Method, uri: Uri) -> HttpAppError {
    HttpAppError(AppError::MethodNotAllowed(format!(
        "Method {} is not allowed on {}",
        method,
        uri.path()
    )))
}

pub async fn not_found(uri: Uri) -> HttpAppError {
    HttpAppError(AppError::NotFound(format!("No route for {}", uri.path())))
}
