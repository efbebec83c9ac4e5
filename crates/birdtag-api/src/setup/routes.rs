//! Route configuration and setup

use crate::constants::{API_PREFIX, MAX_BODY_BYTES};
use crate::handlers;
use crate::state::AppState;
use axum::{
    http::{HeaderValue, Method},
    routing::{get, post},
    Router,
};
use birdtag_core::Config;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

/// Setup all application routes
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router<()>, anyhow::Error> {
    let cors = setup_cors(config);

    let app = Router::new()
        .nest(API_PREFIX, api_routes())
        .fallback(handlers::not_found)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Ok(app)
}

fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/query", post(handlers::query::query))
        .route("/media", get(handlers::media::list_media))
        .route("/media/delete", post(handlers::media::delete_by_addresses))
        .route("/media/delete-by-id", post(handlers::media::delete_by_ids))
        .route("/media/original-url", post(handlers::media::original_url))
        .route("/subscriptions", post(handlers::subscriptions::subscribe))
        .route(
            "/subscriptions/{email}",
            get(handlers::subscriptions::get_subscription),
        )
        .route(
            "/events/record-changed",
            post(handlers::events::record_changed),
        )
        .route(
            "/events/object-created",
            post(handlers::events::object_created),
        )
        .route("/uploads/match", post(handlers::uploads::start_match))
        .route("/uploads/result", get(handlers::uploads::poll_result))
        .method_not_allowed_fallback(handlers::method_not_allowed)
}

/// Setup CORS configuration
fn setup_cors(config: &Config) -> CorsLayer {
    let methods = [Method::GET, Method::POST, Method::OPTIONS];

    if config.cors_origins().iter().any(|o| o == "*") {
        if config.is_production() {
            tracing::warn!("CORS configured to allow all origins - not recommended for production");
        }
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any)
    } else {
        let origins: Vec<HeaderValue> = config
            .cors_origins()
            .iter()
            .filter_map(|o| match o.parse() {
                Ok(origin) => Some(origin),
                Err(_) => {
                    tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers(Any)
    }
}
