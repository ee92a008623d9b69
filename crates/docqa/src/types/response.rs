//! Response and event types

use serde::{Deserialize, Serialize};

/// Answer to a synchronous question
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    /// Generated answer
    pub answer: String,
    /// Chunk texts the answer was grounded on, best match first
    pub contexts: Vec<String>,
    /// Generation model that produced the answer
    pub model: String,
}

/// Result of a file upload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    /// Human readable summary
    pub message: String,
    /// Chunks added by this upload
    pub new_chunks_added: usize,
    /// Index size after the upload
    pub total_chunks_in_index: usize,
}

/// Reachability of the generation service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    /// Service answered successfully
    Connected,
    /// Service answered with an error status
    Error,
    /// Service could not be reached
    Disconnected,
}

/// Health report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall service status
    pub status: String,
    /// Generation service reachability
    pub ollama_status: ServiceStatus,
    /// Configured generation model
    pub ollama_model: String,
    /// Configured embedding model
    pub embedding_model: String,
    /// Number of chunks in the index
    pub total_documents: usize,
}

/// Event pushed to a streaming client, tagged with its session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Retrieved grounding context
    StreamContexts {
        session_id: String,
        contexts: Vec<String>,
    },
    /// Generation has started
    StreamStart { session_id: String, status: String },
    /// One incremental answer fragment
    StreamToken { session_id: String, token: String },
    /// Generation finished; carries the concatenated answer
    StreamEnd {
        session_id: String,
        status: String,
        full_answer: String,
    },
    /// Terminal failure
    StreamError {
        #[serde(skip_serializing_if = "Option::is_none")]
        session_id: Option<String>,
        error: String,
    },
}

impl StreamEvent {
    /// Create a start event
    pub fn start(session_id: &str) -> Self {
        Self::StreamStart {
            session_id: session_id.to_string(),
            status: "generating".to_string(),
        }
    }

    /// Create a token event
    pub fn token(session_id: &str, token: impl Into<String>) -> Self {
        Self::StreamToken {
            session_id: session_id.to_string(),
            token: token.into(),
        }
    }

    /// Create a completion event
    pub fn end(session_id: &str, full_answer: impl Into<String>) -> Self {
        Self::StreamEnd {
            session_id: session_id.to_string(),
            status: "completed".to_string(),
            full_answer: full_answer.into(),
        }
    }

    /// Create an error event, optionally bound to a session
    pub fn error(session_id: Option<&str>, error: impl Into<String>) -> Self {
        Self::StreamError {
            session_id: session_id.map(str::to_string),
            error: error.into(),
        }
    }

    /// Whether this event closes the session
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::StreamEnd { .. } | Self::StreamError { .. })
    }
}
