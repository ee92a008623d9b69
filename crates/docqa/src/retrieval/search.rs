//! Query-time retrieval with a tagged outcome instead of sentinel strings

use std::sync::Arc;

use super::knowledge::{KnowledgeBase, SearchOutcome};

/// Shown when a query arrives before any document was indexed
pub const NO_DOCUMENTS_MESSAGE: &str = "No documents have been indexed yet.";
/// Shown when the index held nothing usable for a query
pub const NO_CONTEXT_MESSAGE: &str = "No relevant context was found.";

/// Outcome of retrieving grounding context for a query
#[derive(Debug, Clone, PartialEq)]
pub enum Retrieval {
    /// Chunk texts, best match first
    Contexts(Vec<String>),
    /// The index is empty or was never created
    NoDocuments,
    /// Search ran but no match mapped back to stored text
    NoRelevantContext,
    /// Embedding or search failed; carries the reason
    Failed(String),
}

impl Retrieval {
    /// Whether retrieval failed
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// Context lines for the generator. Non-result outcomes render as a single
    /// explanatory line so the generator can say it found nothing.
    pub fn into_contexts(self) -> Vec<String> {
        match self {
            Self::Contexts(contexts) => contexts,
            Self::NoDocuments => vec![NO_DOCUMENTS_MESSAGE.to_string()],
            Self::NoRelevantContext => vec![NO_CONTEXT_MESSAGE.to_string()],
            Self::Failed(reason) => vec![format!("Failed to retrieve context: {}", reason)],
        }
    }
}

/// Orchestrates query embedding, index search and text lookup
#[derive(Clone)]
pub struct Retriever {
    knowledge: Arc<KnowledgeBase>,
}

impl Retriever {
    /// Create a retriever over a shared knowledge base
    pub fn new(knowledge: Arc<KnowledgeBase>) -> Self {
        Self { knowledge }
    }

    /// Retrieve up to `k` chunk texts for a query. Never returns an error:
    /// failures are reported as [`Retrieval::Failed`].
    pub async fn retrieve(&self, query: &str, k: usize) -> Retrieval {
        if self.knowledge.is_empty() {
            return Retrieval::NoDocuments;
        }

        match self.knowledge.search(query, k).await {
            Ok(SearchOutcome::EmptyIndex) => Retrieval::NoDocuments,
            Ok(SearchOutcome::Hits(hits)) if hits.is_empty() => Retrieval::NoRelevantContext,
            Ok(SearchOutcome::Hits(hits)) => {
                tracing::debug!(
                    "Retrieved {} chunks, top score {:.3}",
                    hits.len(),
                    hits[0].1
                );
                Retrieval::Contexts(hits.into_iter().map(|(chunk, _)| chunk.text).collect())
            }
            Err(e) => {
                tracing::error!("Retrieval failed: {}", e);
                Retrieval::Failed(e.to_string())
            }
        }
    }
}
