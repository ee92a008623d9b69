//! Vector index, shared corpus state and query-time retrieval

pub mod index;
pub mod knowledge;
pub mod search;

pub use index::{ScoredPosition, VectorIndex};
pub use knowledge::{KnowledgeBase, SearchOutcome};
pub use search::{Retrieval, Retriever, NO_CONTEXT_MESSAGE, NO_DOCUMENTS_MESSAGE};
