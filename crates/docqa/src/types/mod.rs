//! Core types for the question-answering service

pub mod document;
pub mod query;
pub mod response;

pub use document::{Chunk, FileType};
pub use query::{QueryRequest, StreamCommand};
pub use response::{HealthResponse, QueryResponse, StreamEvent, UploadResponse};
