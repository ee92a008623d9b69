//! Request types

use serde::{Deserialize, Serialize};

/// Body of a synchronous question
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryRequest {
    /// The question to answer
    #[serde(default)]
    pub query: Option<String>,
}

impl QueryRequest {
    /// Create a request for the given question
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: Some(query.into()),
        }
    }
}

fn default_session() -> String {
    "default".to_string()
}

/// Message sent by a streaming client over the WebSocket
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamCommand {
    /// Ask a question and stream the answer
    Ask {
        #[serde(default)]
        query: Option<String>,
        #[serde(default = "default_session")]
        session_id: String,
    },
    /// Abandon a running answer
    Cancel {
        #[serde(default = "default_session")]
        session_id: String,
    },
}
