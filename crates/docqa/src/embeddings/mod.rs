//! Embedding providers and vector normalization
//!
//! The embedding model is an external collaborator: given texts it returns one
//! fixed-width vector per text, in order. Vectors are unit-normalized before they
//! reach the index so that inner product equals cosine similarity.

mod ollama;

pub use ollama::OllamaEmbedder;

use async_trait::async_trait;

use crate::error::{Error, Result};

/// Trait for generating text embeddings
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate embeddings for multiple texts, one vector per text in input order
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Generate embedding for a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])
            .await?
            .pop()
            .ok_or_else(|| Error::embedding("provider returned no vector"))
    }

    /// Check if the provider is healthy and available
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;

    /// Get the model being used
    fn model(&self) -> &str;
}

/// Scale a vector to unit L2 norm in place.
///
/// A zero vector is divided by 1.0 and stays the zero vector.
pub fn normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm = if norm == 0.0 { 1.0 } else { norm };
    for x in vector.iter_mut() {
        *x /= norm;
    }
}

/// Owned variant of [`normalize`]
pub fn normalized(mut vector: Vec<f32>) -> Vec<f32> {
    normalize(&mut vector);
    vector
}
