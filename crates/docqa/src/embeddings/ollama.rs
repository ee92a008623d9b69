//! Ollama embedding client with batching and retry

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::sleep;

use crate::config::EmbeddingConfig;
use crate::error::{Error, Result};

use super::EmbeddingProvider;

/// Embedding provider backed by Ollama's `/api/embed` endpoint
pub struct OllamaEmbedder {
    /// HTTP client
    client: Client,
    /// Configuration
    config: EmbeddingConfig,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

impl OllamaEmbedder {
    /// Create a new Ollama embedder
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(5)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    /// Retry a request with exponential backoff
    async fn retry_request<F, Fut, T>(&self, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    last_error = Some(e);
                    if attempt < self.config.max_retries {
                        let delay = backoff_delay(attempt);
                        tracing::warn!(
                            "Embedding request failed (attempt {}/{}), retrying in {:?}",
                            attempt + 1,
                            self.config.max_retries + 1,
                            delay
                        );
                        sleep(delay).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| Error::embedding("Unknown error")))
    }

    /// Embed one request-sized batch
    async fn embed_request(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/api/embed", self.config.base_url);

        self.retry_request(|| {
            let url = url.clone();

            async move {
                let request = EmbedRequest {
                    model: &self.config.model,
                    input: texts,
                };

                let response = self
                    .client
                    .post(&url)
                    .json(&request)
                    .send()
                    .await
                    .map_err(|e| Error::embedding(format!("Embedding request failed: {}", e)))?;

                if !response.status().is_success() {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    return Err(Error::embedding(format!(
                        "Embedding failed: HTTP {} - {}",
                        status, body
                    )));
                }

                let embed_response: EmbedResponse = response.json().await.map_err(|e| {
                    Error::embedding(format!("Failed to parse embedding response: {}", e))
                })?;

                if embed_response.embeddings.len() != texts.len() {
                    return Err(Error::embedding(format!(
                        "Expected {} embeddings, got {}",
                        texts.len(),
                        embed_response.embeddings.len()
                    )));
                }

                Ok(embed_response.embeddings)
            }
        })
        .await
    }
}

/// Delay before retry `attempt + 1`: 500ms doubling, capped at 30s
fn backoff_delay(attempt: u32) -> Duration {
    let millis = 500u64.saturating_mul(2u64.saturating_pow(attempt));
    Duration::from_millis(millis.min(30_000))
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.config.batch_size.max(1)) {
            embeddings.extend(self.embed_request(batch).await?);
        }
        tracing::debug!("Embedded {} texts with {}", texts.len(), self.config.model);
        Ok(embeddings)
    }

    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/api/tags", self.config.base_url);

        match self.client.get(&url).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    fn name(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}
