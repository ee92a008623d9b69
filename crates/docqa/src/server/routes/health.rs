//! Health and service information endpoints

use axum::{extract::State, Json};

use crate::server::state::AppState;
use crate::types::HealthResponse;

/// GET /health - Service status, generator reachability, models and index size
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let ollama_status = state.generator().health_check().await;

    Json(HealthResponse {
        status: "running".to_string(),
        ollama_status,
        ollama_model: state.generator().model().to_string(),
        embedding_model: state.knowledge().embedder().model().to_string(),
        total_documents: state.knowledge().len(),
    })
}

/// GET /info - Service information
pub async fn info(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": "docqa",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Question answering grounded in uploaded documents",
        "active_streams": state.active_sessions(),
        "endpoints": {
            "POST /ask": "Answer a question",
            "GET /ws": "Streaming answers over WebSocket",
            "POST /upload": "Upload a .txt or .pdf document",
            "GET /health": "Service and model status"
        }
    }))
}
