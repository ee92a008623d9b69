//! Shared index state: the vector index, its parallel chunk store, and the embedder

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::embeddings::{normalize, EmbeddingProvider};
use crate::error::{Error, Result};
use crate::types::Chunk;

use super::index::{ScoredPosition, VectorIndex};

/// Index plus parallel text store. Row `i` of the index is `chunks[i]`.
#[derive(Debug, Default)]
pub(crate) struct IndexedCorpus {
    /// Created on the first successful ingestion
    pub(crate) index: Option<VectorIndex>,
    /// Chunk texts in index order
    pub(crate) chunks: Vec<Chunk>,
}

impl IndexedCorpus {
    fn len(&self) -> usize {
        self.index.as_ref().map_or(0, VectorIndex::len)
    }

    /// Append vectors and their chunks together, or neither
    fn append(&mut self, vectors: Vec<Vec<f32>>, chunks: Vec<Chunk>) -> Result<()> {
        if vectors.len() != chunks.len() {
            return Err(Error::embedding(format!(
                "Expected {} embeddings, got {}",
                chunks.len(),
                vectors.len()
            )));
        }

        match self.index.as_mut() {
            Some(index) => index.add(&vectors)?,
            None => {
                let index = VectorIndex::from_batch(&vectors)?;
                tracing::info!("Created vector index with dimension {}", index.dimension());
                self.index = Some(index);
            }
        }
        self.chunks.extend(chunks);
        Ok(())
    }
}

/// Matches for one query, resolved to chunk text
#[derive(Debug, Clone)]
pub enum SearchOutcome {
    /// Nothing has been indexed yet
    EmptyIndex,
    /// Ranked hits that resolved to a chunk; out-of-range positions are dropped
    Hits(Vec<(Chunk, f32)>),
}

/// Process-wide retrieval state shared by the ingestion and query paths.
///
/// A single async mutex covers embed + index mutation during ingestion and
/// embed + search during queries, so the embedding model is never invoked
/// concurrently and no reader sees the index ahead of its text store.
pub struct KnowledgeBase {
    embedder: Arc<dyn EmbeddingProvider>,
    corpus: Mutex<IndexedCorpus>,
    /// Mirror of the index size, readable without the lock
    size: AtomicUsize,
}

impl KnowledgeBase {
    /// Create an empty knowledge base around an embedding provider
    pub fn new(embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            embedder,
            corpus: Mutex::new(IndexedCorpus::default()),
            size: AtomicUsize::new(0),
        }
    }

    /// The embedding provider
    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedder
    }

    /// Number of indexed chunks
    pub fn len(&self) -> usize {
        self.size.load(Ordering::Acquire)
    }

    /// Check if nothing has been indexed
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Embed and index a batch of chunks. Returns the number of chunks added.
    pub async fn index_chunks(&self, chunks: Vec<Chunk>) -> Result<usize> {
        if chunks.is_empty() {
            return Ok(0);
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let count = chunks.len();

        let mut corpus = self.corpus.lock().await;

        let mut vectors = self.embedder.embed_batch(&texts).await?;
        for vector in vectors.iter_mut() {
            normalize(vector);
        }

        corpus.append(vectors, chunks)?;
        let total = corpus.len();
        self.size.store(total, Ordering::Release);

        tracing::info!("Added {} chunks to the index: {} total", count, total);
        Ok(count)
    }

    /// Embed a query and return the top-k chunks
    pub async fn search(&self, query: &str, k: usize) -> Result<SearchOutcome> {
        let corpus = self.corpus.lock().await;

        let index = match corpus.index.as_ref() {
            Some(index) if !index.is_empty() => index,
            _ => return Ok(SearchOutcome::EmptyIndex),
        };

        let mut query_vector = self.embedder.embed(query).await?;
        normalize(&mut query_vector);

        let hits = index.search(&query_vector, k)?;
        Ok(SearchOutcome::Hits(resolve_hits(&hits, &corpus.chunks)))
    }

    #[cfg(test)]
    pub(crate) async fn corpus(&self) -> tokio::sync::MutexGuard<'_, IndexedCorpus> {
        self.corpus.lock().await
    }
}

/// Map index positions to chunks, skipping positions the text store does not hold
fn resolve_hits(hits: &[ScoredPosition], chunks: &[Chunk]) -> Vec<(Chunk, f32)> {
    hits.iter()
        .filter_map(|hit| match chunks.get(hit.position) {
            Some(chunk) => Some((chunk.clone(), hit.score)),
            None => {
                tracing::warn!(
                    "Search returned position {} beyond text store of {}",
                    hit.position,
                    chunks.len()
                );
                None
            }
        })
        .collect()
}
