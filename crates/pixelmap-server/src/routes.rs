use axum::{Router, http::StatusCode, routing::get};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::gateway;
use crate::state::AppState;

/// Build the HTTP router: health check plus the WebSocket gateway on every
/// other path.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health).fallback(not_found))
        .fallback(gateway::entry)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check
async fn health() -> &'static str {
    "ok"
}

async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}
