//! Ollama client for grounded answer generation

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, BoxStream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

use crate::config::LlmConfig;
use crate::error::{Error, Result};
use crate::types::response::ServiceStatus;

use super::prompt::PromptBuilder;
use super::{AnswerGenerator, TokenStream};

/// Returned when the model produced only whitespace
pub const EMPTY_ANSWER: &str = "Sorry, I could not generate an answer.";

/// Ollama API client
pub struct OllamaClient {
    /// HTTP client carrying the request timeout
    client: Client,
    /// Configuration
    config: LlmConfig,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
    top_p: f32,
    top_k: u32,
    num_predict: i32,
    num_ctx: u32,
    repeat_penalty: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

/// One NDJSON line of a streamed generation
#[derive(Deserialize)]
struct StreamChunk {
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Deserialize)]
struct ModelTag {
    name: String,
}

impl OllamaClient {
    /// Create a new Ollama client
    pub fn new(config: &LlmConfig) -> Result<Self> {
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

    fn request<'a>(&'a self, question: &str, contexts: &[String], stream: bool) -> GenerateRequest<'a> {
        GenerateRequest {
            model: &self.config.generate_model,
            prompt: PromptBuilder::build_prompt(question, contexts),
            stream,
            options: GenerateOptions {
                temperature: self.config.temperature,
                top_p: self.config.top_p,
                top_k: self.config.top_k,
                num_predict: self.config.num_predict,
                num_ctx: self.config.num_ctx,
                repeat_penalty: self.config.repeat_penalty,
            },
        }
    }

    /// Send a generate request and check the status
    async fn send(&self, request: &GenerateRequest<'_>) -> Result<reqwest::Response> {
        let url = format!("{}/api/generate", self.config.base_url);

        tracing::info!("Sending request to Ollama with model {}", request.model);

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Ollama returned HTTP {}: {}", status, body);
            return Err(Error::LlmStatus { status, body });
        }

        Ok(response)
    }

    /// Classify a transport failure
    fn map_request_error(&self, err: reqwest::Error) -> Error {
        classify_error(err, &self.config.base_url, self.config.timeout_secs)
    }

    /// Check that the service is up and the configured model is pulled.
    ///
    /// Returns `Ok(false)` when the service answers but lacks the model.
    pub async fn check_model(&self) -> Result<bool> {
        let url = format!("{}/api/tags", self.config.base_url);
        let response = self
            .client
            .get(&url)
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;

        if !response.status().is_success() {
            return Err(Error::LlmStatus {
                status: response.status().as_u16(),
                body: "could not list models".to_string(),
            });
        }

        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| Error::llm(format!("Failed to parse model list: {}", e)))?;
        let names: Vec<String> = tags.models.into_iter().map(|m| m.name).collect();

        let available = names
            .iter()
            .any(|name| name.contains(&self.config.generate_model));
        if !available {
            tracing::warn!(
                "Model '{}' not found in Ollama; run: ollama pull {} (available: {:?})",
                self.config.generate_model,
                self.config.generate_model,
                names
            );
        }
        Ok(available)
    }
}

/// Map a `reqwest` failure to the matching generation error
fn classify_error(err: reqwest::Error, base_url: &str, timeout_secs: u64) -> Error {
    if err.is_timeout() {
        Error::LlmTimeout { secs: timeout_secs }
    } else if err.is_connect() {
        Error::LlmUnavailable(base_url.to_string())
    } else {
        Error::llm(format!("Generation request failed: {}", err))
    }
}

#[async_trait]
impl AnswerGenerator for OllamaClient {
    async fn generate(&self, question: &str, contexts: &[String]) -> Result<String> {
        let request = self.request(question, contexts, false);
        let response = self.send(&request).await?;

        let generated: GenerateResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                Error::LlmTimeout {
                    secs: self.config.timeout_secs,
                }
            } else {
                Error::llm(format!("Failed to parse generation response: {}", e))
            }
        })?;

        let answer = generated.response.trim();
        if answer.is_empty() {
            Ok(EMPTY_ANSWER.to_string())
        } else {
            Ok(answer.to_string())
        }
    }

    async fn generate_stream(&self, question: &str, contexts: &[String]) -> Result<TokenStream> {
        let request = self.request(question, contexts, true);
        let response = self.send(&request).await?;

        let base_url = self.config.base_url.clone();
        let timeout_secs = self.config.timeout_secs;
        let bytes = response
            .bytes_stream()
            .map(move |chunk| chunk.map_err(|e| classify_error(e, &base_url, timeout_secs)))
            .boxed();

        Ok(token_stream(bytes))
    }

    async fn health_check(&self) -> ServiceStatus {
        let url = format!("{}/api/tags", self.config.base_url);

        match self
            .client
            .get(&url)
            .timeout(Duration::from_secs(5))
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => ServiceStatus::Connected,
            Ok(_) => ServiceStatus::Error,
            Err(_) => ServiceStatus::Disconnected,
        }
    }

    fn model(&self) -> &str {
        &self.config.generate_model
    }
}

/// Incremental decoder for Ollama's newline-delimited JSON stream.
///
/// Network chunks may end mid-line; the partial tail is kept until the next push.
#[derive(Debug, Default)]
pub struct NdjsonDecoder {
    buffer: Vec<u8>,
    done: bool,
}

impl NdjsonDecoder {
    /// Create an empty decoder
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the `done` marker has been seen
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Feed bytes; returns the fragments completed by them
    pub fn push(&mut self, bytes: &[u8]) -> Vec<Result<String>> {
        self.buffer.extend_from_slice(bytes);

        let mut out = Vec::new();
        while !self.done {
            let Some(newline) = self.buffer.iter().position(|b| *b == b'\n') else {
                break;
            };
            let line: Vec<u8> = self.buffer.drain(..=newline).collect();
            self.decode_line(&line, &mut out);
        }
        out
    }

    /// Flush a trailing line that had no newline
    pub fn finish(&mut self) -> Vec<Result<String>> {
        let mut out = Vec::new();
        if !self.done && !self.buffer.is_empty() {
            let line = std::mem::take(&mut self.buffer);
            self.decode_line(&line, &mut out);
        }
        self.done = true;
        out
    }

    fn decode_line(&mut self, line: &[u8], out: &mut Vec<Result<String>>) {
        if line.iter().all(u8::is_ascii_whitespace) {
            return;
        }

        match serde_json::from_slice::<StreamChunk>(line) {
            Ok(chunk) => {
                if let Some(error) = chunk.error {
                    out.push(Err(Error::llm(error)));
                    self.done = true;
                    return;
                }
                if !chunk.response.is_empty() {
                    out.push(Ok(chunk.response));
                }
                if chunk.done {
                    self.done = true;
                }
            }
            Err(e) => {
                tracing::warn!("Skipping malformed stream line: {}", e);
            }
        }
    }
}

struct StreamState {
    bytes: BoxStream<'static, Result<Bytes>>,
    decoder: NdjsonDecoder,
    pending: VecDeque<Result<String>>,
}

/// Turn a raw byte stream into a stream of answer fragments
fn token_stream(bytes: BoxStream<'static, Result<Bytes>>) -> TokenStream {
    let state = StreamState {
        bytes,
        decoder: NdjsonDecoder::new(),
        pending: VecDeque::new(),
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.pending.pop_front() {
                return Some((item, state));
            }
            if state.decoder.is_done() {
                return None;
            }
            match state.bytes.next().await {
                Some(Ok(chunk)) => state.pending.extend(state.decoder.push(&chunk)),
                Some(Err(e)) => {
                    state.decoder.done = true;
                    return Some((Err(e), state));
                }
                None => state.pending.extend(state.decoder.finish()),
            }
        }
    })
    .boxed()
}
