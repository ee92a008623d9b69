//! Application state for the server

use dashmap::DashMap;
use std::sync::Arc;

use crate::config::RagConfig;
use crate::embeddings::{EmbeddingProvider, OllamaEmbedder};
use crate::error::{Error, Result};
use crate::generation::{AnswerGenerator, CancelFlag, OllamaClient};
use crate::ingestion::{IngestPipeline, TextChunker};
use crate::retrieval::{KnowledgeBase, Retriever};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Configuration
    config: RagConfig,
    /// Vector index, text store and embedder behind one lock
    knowledge: Arc<KnowledgeBase>,
    /// Query-time retrieval
    retriever: Retriever,
    /// Document ingestion
    pipeline: IngestPipeline,
    /// Answer generator
    generator: Arc<dyn AnswerGenerator>,
    /// Streaming sessions still generating, by session id
    sessions: DashMap<String, CancelFlag>,
}

impl AppState {
    /// Create state around explicit providers
    pub fn new(
        config: RagConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        generator: Arc<dyn AnswerGenerator>,
    ) -> Result<Self> {
        config.validate()?;

        let chunker = TextChunker::from_config(&config.chunking)?;
        let knowledge = Arc::new(KnowledgeBase::new(embedder));
        let retriever = Retriever::new(Arc::clone(&knowledge));
        let pipeline = IngestPipeline::new(chunker, Arc::clone(&knowledge));

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                knowledge,
                retriever,
                pipeline,
                generator,
                sessions: DashMap::new(),
            }),
        })
    }

    /// Create state backed by Ollama for both embeddings and generation
    pub fn from_config(config: RagConfig) -> Result<Self> {
        tracing::info!("Initializing application state...");

        let embedder = Arc::new(OllamaEmbedder::new(&config.embeddings)?);
        tracing::info!(
            "Embedding provider initialized ({} at {})",
            config.embeddings.model,
            config.embeddings.base_url
        );

        let generator = Arc::new(OllamaClient::new(&config.llm)?);
        tracing::info!(
            "Ollama client initialized ({} at {})",
            config.llm.generate_model,
            config.llm.base_url
        );

        Self::new(config, embedder, generator)
    }

    /// Get configuration
    pub fn config(&self) -> &RagConfig {
        &self.inner.config
    }

    /// Get the knowledge base
    pub fn knowledge(&self) -> &Arc<KnowledgeBase> {
        &self.inner.knowledge
    }

    /// Get the retriever
    pub fn retriever(&self) -> &Retriever {
        &self.inner.retriever
    }

    /// Get the ingestion pipeline
    pub fn pipeline(&self) -> &IngestPipeline {
        &self.inner.pipeline
    }

    /// Get the answer generator
    pub fn generator(&self) -> &Arc<dyn AnswerGenerator> {
        &self.inner.generator
    }

    /// Check a raw query: present, non-blank, within the length cap, and
    /// something indexed to answer from.
    pub fn validate_query(&self, query: Option<String>) -> Result<String> {
        let query = match query {
            Some(q) if !q.trim().is_empty() => q,
            _ => return Err(Error::InvalidQuery("No query provided".into())),
        };

        if self.inner.knowledge.is_empty() {
            return Err(Error::EmptyIndex);
        }

        let max = self.inner.config.retrieval.max_query_length;
        if query.chars().count() > max {
            return Err(Error::InvalidQuery(format!(
                "Query exceeds the maximum length of {} characters",
                max
            )));
        }

        Ok(query)
    }

    /// Register a streaming session; a previous answer under the same id is cancelled
    pub fn register_session(&self, session_id: &str) -> CancelFlag {
        let flag = CancelFlag::new();
        if let Some(previous) = self
            .inner
            .sessions
            .insert(session_id.to_string(), flag.clone())
        {
            previous.cancel();
        }
        flag
    }

    /// Cancel a running session. Returns false if no such session is running.
    pub fn cancel_session(&self, session_id: &str) -> bool {
        match self.inner.sessions.get(session_id) {
            Some(flag) => {
                flag.cancel();
                true
            }
            None => false,
        }
    }

    /// Forget a finished session, unless the id was since reused
    pub fn finish_session(&self, session_id: &str, flag: &CancelFlag) {
        self.inner
            .sessions
            .remove_if(session_id, |_, current| current.same_as(flag));
    }

    /// Whether `flag` is still the running session registered under `session_id`
    pub fn is_session_live(&self, session_id: &str, flag: &CancelFlag) -> bool {
        !flag.is_cancelled()
            && self
                .inner
                .sessions
                .get(session_id)
                .map_or(false, |current| current.same_as(flag))
    }

    /// Number of sessions currently generating
    pub fn active_sessions(&self) -> usize {
        self.inner.sessions.len()
    }
}
