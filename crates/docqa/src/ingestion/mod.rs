//! Document ingestion: text extraction, chunking and indexing

mod chunker;
mod parser;
mod processor;

pub use chunker::TextChunker;
pub use parser::{FileParser, ParsedDocument};
pub use processor::{sanitize_filename, IngestPipeline, IngestSummary};
