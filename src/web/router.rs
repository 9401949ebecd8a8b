//! Router configuration.

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use super::handlers::{create_room, list_rooms, register, AppState};
use super::ws::chat_ws_handler;

/// Create the application router.
pub fn create_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        .route("/register", post(register))
        .route("/rooms", get(list_rooms).post(create_room));

    Router::new()
        .route("/ws", get(chat_ws_handler))
        .nest("/v1", api_routes)
        .merge(create_health_router())
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

/// Create a health check router.
pub fn create_health_router<S: Clone + Send + Sync + 'static>() -> Router<S> {
    Router::new().route("/health", get(health_check))
}

/// Health check handler.
async fn health_check() -> &'static str {
    "ok"
}
