//! Configuration for the question-answering service

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Upper bound for `embeddings.max_retries`
pub const MAX_RETRIES: u32 = 10;

/// Main service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Embedding configuration
    pub embeddings: EmbeddingConfig,
    /// Chunking configuration
    pub chunking: ChunkingConfig,
    /// Ollama/LLM configuration
    pub llm: LlmConfig,
    /// Retrieval configuration
    pub retrieval: RetrievalConfig,
    /// Document directory configuration
    pub documents: DocumentsConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
    /// Maximum upload size in bytes (default: 100MB)
    pub max_upload_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 9003,
            enable_cors: true,
            max_upload_size: 100 * 1024 * 1024, // 100MB
        }
    }
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Ollama base URL serving the embedding model
    pub base_url: String,
    /// Embedding model name
    pub model: String,
    /// Texts sent per embedding request
    pub batch_size: usize,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Number of retries for failed requests
    pub max_retries: u32,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "nomic-embed-text".to_string(),
            batch_size: 32,
            timeout_secs: 60,
            max_retries: 3,
        }
    }
}

/// Text chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Window size in characters
    pub chunk_size: usize,
    /// Characters shared by consecutive windows
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 50,
        }
    }
}

impl ChunkingConfig {
    /// Distance between consecutive window starts
    pub fn stride(&self) -> usize {
        self.chunk_size.saturating_sub(self.chunk_overlap)
    }
}

/// LLM (Ollama) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Ollama base URL
    pub base_url: String,
    /// Generation model name
    pub generate_model: String,
    /// Request timeout in seconds, covering the whole (streamed) answer
    pub timeout_secs: u64,
    /// Sampling temperature
    pub temperature: f32,
    /// Nucleus sampling cutoff
    pub top_p: f32,
    /// Top-k sampling cutoff
    pub top_k: u32,
    /// Maximum tokens to generate
    pub num_predict: i32,
    /// Context window size (tokens)
    pub num_ctx: u32,
    /// Repetition penalty
    pub repeat_penalty: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            generate_model: "qwen2.5:7b".to_string(),
            timeout_secs: 120,
            temperature: 0.7,
            top_p: 0.9,
            top_k: 40,
            num_predict: 512,
            num_ctx: 2048,
            repeat_penalty: 1.1,
        }
    }
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Chunks handed to the generator per query
    pub top_k: usize,
    /// Longest accepted query, in characters
    pub max_query_length: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            max_query_length: 1000,
        }
    }
}

/// Document directory configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentsConfig {
    /// Directory scanned at startup; uploads are saved here too
    pub dir: PathBuf,
}

impl Default for DocumentsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("documents"),
        }
    }
}

impl RagConfig {
    /// Load configuration: defaults, then an optional TOML file, then environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&raw)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| Error::Config(format!("Invalid config: {}", e)))
    }

    /// Overlay values from environment-style lookups
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("DOCQA_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("DOCQA_PORT") {
            self.server.port = parse_env("DOCQA_PORT", &port)?;
        }
        if let Some(dir) = lookup("DOCQA_DOCUMENTS_DIR") {
            self.documents.dir = PathBuf::from(dir);
        }
        if let Some(url) = lookup("OLLAMA_HOST") {
            let url = if url.starts_with("http") {
                url
            } else {
                format!("http://{}", url)
            };
            self.embeddings.base_url = url.clone();
            self.llm.base_url = url;
        }
        if let Some(model) = lookup("DOCQA_EMBED_MODEL") {
            self.embeddings.model = model;
        }
        if let Some(model) = lookup("DOCQA_GENERATE_MODEL") {
            self.llm.generate_model = model;
        }
        if let Some(size) = lookup("DOCQA_CHUNK_SIZE") {
            self.chunking.chunk_size = parse_env("DOCQA_CHUNK_SIZE", &size)?;
        }
        if let Some(overlap) = lookup("DOCQA_CHUNK_OVERLAP") {
            self.chunking.chunk_overlap = parse_env("DOCQA_CHUNK_OVERLAP", &overlap)?;
        }
        Ok(())
    }

    /// Reject settings the service cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.chunking.chunk_size == 0 {
            return Err(Error::Config("chunk_size must be greater than zero".into()));
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(Error::Config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunking.chunk_overlap, self.chunking.chunk_size
            )));
        }
        if self.retrieval.top_k == 0 {
            return Err(Error::Config("retrieval.top_k must be at least 1".into()));
        }
        if self.retrieval.max_query_length == 0 {
            return Err(Error::Config("retrieval.max_query_length must be at least 1".into()));
        }
        if self.embeddings.batch_size == 0 {
            return Err(Error::Config("embeddings.batch_size must be at least 1".into()));
        }
        if self.embeddings.max_retries > MAX_RETRIES {
            return Err(Error::Config(format!(
                "embeddings.max_retries must be at most {}",
                MAX_RETRIES
            )));
        }
        if self.llm.timeout_secs == 0 || self.embeddings.timeout_secs == 0 {
            return Err(Error::Config("timeouts must be at least one second".into()));
        }
        Ok(())
    }

    /// Socket address string for the HTTP server
    pub fn address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("{} has an invalid value: {:?}", key, value)))
}
