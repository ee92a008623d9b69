//! HTTP server for the question-answering service

pub mod routes;
pub mod state;

use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::RagConfig;
use crate::embeddings::{EmbeddingProvider, OllamaEmbedder};
use crate::error::{Error, Result};
use crate::generation::OllamaClient;
use crate::ingestion::IngestSummary;
use state::AppState;

/// Question-answering HTTP server
pub struct RagServer {
    state: AppState,
}

impl RagServer {
    /// Wrap prepared state
    pub fn from_state(state: AppState) -> Self {
        Self { state }
    }

    /// Build Ollama-backed state, probe both services and index the
    /// documents directory.
    ///
    /// An unreachable embedding service is fatal; an unreachable generation
    /// service is only logged.
    pub async fn prepare(config: RagConfig) -> Result<(Self, IngestSummary)> {
        config.validate()?;

        let embedder = Arc::new(OllamaEmbedder::new(&config.embeddings)?);
        tracing::info!(
            "Checking embedding service at {}...",
            config.embeddings.base_url
        );
        probe_embedder(embedder.as_ref()).await?;

        let generator = Arc::new(OllamaClient::new(&config.llm)?);
        tracing::info!("Checking Ollama at {}...", config.llm.base_url);
        match generator.check_model().await {
            Ok(true) => tracing::info!("Ollama is running"),
            Ok(false) => tracing::warn!(
                "Ollama is running but '{}' is not pulled",
                config.llm.generate_model
            ),
            Err(e) => {
                tracing::warn!("Ollama not available: {}", e);
                tracing::warn!("Answers will fail until the generation service is reachable");
            }
        }

        let state = AppState::new(config, embedder, generator)?;
        let summary = state
            .pipeline()
            .ingest_directory(&state.config().documents.dir)
            .await?;

        Ok((Self::from_state(state), summary))
    }

    /// Shared state
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Build the router with all routes
    pub fn router(&self) -> Router {
        build_router(self.state.clone())
    }

    /// Start the server and run until Ctrl-C
    pub async fn start(self) -> Result<()> {
        let addr: SocketAddr = self
            .address()
            .parse()
            .map_err(|e| Error::Config(format!("Invalid address: {}", e)))?;

        let router = self.router();

        tracing::info!("Starting server on http://{}", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| Error::Config(format!("Failed to bind: {}", e)))?;

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| Error::Internal(format!("Server error: {}", e)))?;

        tracing::info!("Server stopped");
        Ok(())
    }

    /// Get the server address
    pub fn address(&self) -> String {
        self.state.config().address()
    }
}

/// Build the router around existing state
pub fn build_router(state: AppState) -> Router {
    let server = &state.config().server;
    let router = routes::routes(server.max_upload_size)
        .with_state(state.clone())
        .layer(TraceLayer::new_for_http());

    if server.enable_cors {
        router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
    } else {
        router
    }
}

/// Fail unless the embedding service answers and produces a vector
async fn probe_embedder(embedder: &dyn EmbeddingProvider) -> Result<()> {
    if !embedder.health_check().await? {
        return Err(Error::embedding(format!(
            "Embedding service is not healthy; run: ollama pull {}",
            embedder.model()
        )));
    }

    let probe = embedder.embed("startup probe").await?;
    tracing::info!(
        "Embedding model {} ready ({} dimensions)",
        embedder.model(),
        probe.len()
    );
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
