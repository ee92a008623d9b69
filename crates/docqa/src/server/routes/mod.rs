//! HTTP and WebSocket routes

pub mod health;
pub mod ingest;
pub mod query;
pub mod stream;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::server::state::AppState;

/// Build all routes
pub fn routes(max_upload_size: usize) -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/info", get(health::info))
        .route("/ask", post(query::ask))
        .route("/ws", get(stream::ws_handler))
        // Larger body limit for file uploads
        .route(
            "/upload",
            post(ingest::upload_file).layer(DefaultBodyLimit::max(max_upload_size)),
        )
}
