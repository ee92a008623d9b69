//! Error types for the question-answering service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Result type alias for service operations
pub type Result<T> = std::result::Result<T, Error>;

/// Service errors
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Rejected query (missing, empty or too long)
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Query arrived before any document was indexed
    #[error("No documents have been indexed yet")]
    EmptyIndex,

    /// Malformed upload request
    #[error("Invalid upload: {0}")]
    InvalidUpload(String),

    /// Unsupported file type
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    /// File parsing error
    #[error("Failed to parse file '{filename}': {message}")]
    FileParse { filename: String, message: String },

    /// File parsed but yielded no text
    #[error("Could not read any text from '{0}'")]
    EmptyDocument(String),

    /// Embedding error
    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    /// Vector width differs from the index dimension
    #[error("Embedding dimension mismatch: index expects {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Generation service could not be reached
    #[error("Cannot connect to the generation service at {0}. Make sure Ollama is running (ollama serve)")]
    LlmUnavailable(String),

    /// Generation service did not answer in time
    #[error("Generation request timed out after {secs} seconds")]
    LlmTimeout { secs: u64 },

    /// Generation service answered with a non-success status
    #[error("Generation service returned HTTP {status}: {body}")]
    LlmStatus { status: u16, body: String },

    /// Other generation failure
    #[error("LLM error: {0}")]
    Llm(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a file parse error
    pub fn file_parse(filename: impl Into<String>, message: impl Into<String>) -> Self {
        Self::FileParse {
            filename: filename.into(),
            message: message.into(),
        }
    }

    /// Create an embedding error
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding(message.into())
    }

    /// Create an LLM error
    pub fn llm(message: impl Into<String>) -> Self {
        Self::Llm(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Whether the error was caused by the caller's input rather than the service
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidQuery(_)
                | Error::EmptyIndex
                | Error::InvalidUpload(_)
                | Error::UnsupportedFileType(_)
                | Error::FileParse { .. }
                | Error::EmptyDocument(_)
        )
    }

    /// HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        if self.is_client_error() {
            return StatusCode::BAD_REQUEST;
        }
        match self {
            Error::LlmUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::LlmTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            Error::LlmStatus { .. } => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }

        let body = Json(json!({ "error": self.to_string() }));

        (status, body).into_response()
    }
}
