//! docqa: document question answering with grounded LLM answers
//!
//! Documents (`.txt`, `.pdf`) are split into overlapping character windows,
//! embedded through an external embedding service and kept in an exact
//! cosine-similarity index. Queries retrieve the closest chunks and hand them
//! to a generation model, either as one answer or as a stream of tokens.

pub mod config;
pub mod embeddings;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod retrieval;
pub mod server;
pub mod types;

pub use config::RagConfig;
pub use error::{Error, Result};
pub use types::{
    document::{Chunk, FileType},
    query::{QueryRequest, StreamCommand},
    response::{QueryResponse, StreamEvent},
};
