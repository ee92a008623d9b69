//! Synchronous question endpoint

use axum::{extract::State, Json};
use std::time::Instant;

use crate::error::{Error, Result};
use crate::retrieval::Retrieval;
use crate::server::state::AppState;
use crate::types::{QueryRequest, QueryResponse};

/// POST /ask - Answer a question from the indexed documents
pub async fn ask(
    State(state): State<AppState>,
    request: Option<Json<QueryRequest>>,
) -> Result<Json<QueryResponse>> {
    let start = Instant::now();

    let query = state.validate_query(request.and_then(|Json(r)| r.query))?;
    tracing::info!("Query: \"{}\"", query);

    let top_k = state.config().retrieval.top_k;
    let contexts = match state.retriever().retrieve(&query, top_k).await {
        Retrieval::Failed(reason) => {
            return Err(Error::internal(format!(
                "Failed to retrieve context: {}",
                reason
            )))
        }
        retrieval => retrieval.into_contexts(),
    };

    let answer = state.generator().generate(&query, &contexts).await?;

    tracing::info!(
        "Query answered in {}ms from {} contexts",
        start.elapsed().as_millis(),
        contexts.len()
    );

    Ok(Json(QueryResponse {
        answer,
        contexts,
        model: state.generator().model().to_string(),
    }))
}
