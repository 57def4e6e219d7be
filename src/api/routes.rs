use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use super::handlers;
use super::AppState;

/// Creates the status API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/status", get(handlers::get_status))
        .route("/catalog", get(handlers::get_catalog))
        .route("/match", post(handlers::match_preference))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
