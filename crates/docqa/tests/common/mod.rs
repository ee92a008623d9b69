//! Deterministic providers for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use docqa::embeddings::EmbeddingProvider;
use docqa::generation::{AnswerGenerator, TokenStream};
use docqa::server::state::AppState;
use docqa::types::response::ServiceStatus;
use docqa::{RagConfig, Result};
use futures::stream::{self, StreamExt};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::sync::Arc;

const DIMENSIONS: usize = 64;

/// Bag-of-words embedder: each lowercase word bumps one hashed dimension
pub struct BagOfWordsEmbedder;

impl BagOfWordsEmbedder {
    pub fn vector(text: &str) -> Vec<f32> {
        let mut vector = vec![0.0; DIMENSIONS];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.len() > 2)
        {
            let mut hasher = DefaultHasher::new();
            word.to_lowercase().hash(&mut hasher);
            vector[(hasher.finish() as usize) % DIMENSIONS] += 1.0;
        }
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for BagOfWordsEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| Self::vector(t)).collect())
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "bag-of-words"
    }

    fn model(&self) -> &str {
        "bow-64"
    }
}

/// Generator that answers with its best context, word by word when streaming
pub struct EchoGenerator;

impl EchoGenerator {
    fn answer(contexts: &[String]) -> String {
        format!("From the documents: {}", contexts.first().map(String::as_str).unwrap_or(""))
    }
}

#[async_trait]
impl AnswerGenerator for EchoGenerator {
    async fn generate(&self, _question: &str, contexts: &[String]) -> Result<String> {
        Ok(Self::answer(contexts))
    }

    async fn generate_stream(&self, _question: &str, contexts: &[String]) -> Result<TokenStream> {
        let tokens: Vec<Result<String>> = Self::answer(contexts)
            .split_inclusive(' ')
            .map(|t| Ok(t.to_string()))
            .collect();
        Ok(stream::iter(tokens).boxed())
    }

    async fn health_check(&self) -> ServiceStatus {
        ServiceStatus::Connected
    }

    fn model(&self) -> &str {
        "echo"
    }
}

/// State with stub providers and documents stored under `dir`
pub fn test_state(dir: &Path) -> AppState {
    let mut config = RagConfig::default();
    config.documents.dir = dir.to_path_buf();
    config.chunking.chunk_size = 200;
    config.chunking.chunk_overlap = 20;
    config.retrieval.max_query_length = 100;

    AppState::new(config, Arc::new(BagOfWordsEmbedder), Arc::new(EchoGenerator))
        .expect("valid test config")
}
