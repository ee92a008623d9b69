//! Exact inner-product vector index

use crate::error::{Error, Result};

/// A search hit: insertion position and inner-product score
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredPosition {
    /// Position of the vector in insertion order
    pub position: usize,
    /// Inner product with the query (cosine similarity for unit vectors)
    pub score: f32,
}

/// Append-only flat index of unit vectors with brute-force top-k search.
///
/// Vectors are stored row-major in one contiguous buffer. Row `i` is the
/// `i`-th vector ever added; nothing is removed or reordered.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    /// Fixed vector width
    dimension: usize,
    /// Row-major vector storage
    data: Vec<f32>,
}

impl VectorIndex {
    /// Create an empty index for vectors of the given width
    pub fn new(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(Error::embedding("embedding dimension must be non-zero"));
        }
        Ok(Self {
            dimension,
            data: Vec::new(),
        })
    }

    /// Create an index whose dimension is taken from the first vector of a batch
    pub fn from_batch(vectors: &[Vec<f32>]) -> Result<Self> {
        let first = vectors
            .first()
            .ok_or_else(|| Error::embedding("cannot create an index from an empty batch"))?;
        let mut index = Self::new(first.len())?;
        index.add(vectors)?;
        Ok(index)
    }

    /// Vector width
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of stored vectors
    pub fn len(&self) -> usize {
        self.data.len() / self.dimension
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Append vectors. The whole batch is rejected if any vector has the wrong width.
    pub fn add(&mut self, vectors: &[Vec<f32>]) -> Result<()> {
        if let Some(bad) = vectors.iter().find(|v| v.len() != self.dimension) {
            return Err(Error::DimensionMismatch {
                expected: self.dimension,
                actual: bad.len(),
            });
        }

        self.data.reserve(vectors.len() * self.dimension);
        for vector in vectors {
            self.data.extend_from_slice(vector);
        }
        Ok(())
    }

    /// Stored vector at a position
    pub fn get(&self, position: usize) -> Option<&[f32]> {
        let start = position.checked_mul(self.dimension)?;
        self.data.get(start..start + self.dimension)
    }

    /// Exact top-k by descending inner product; equal scores keep insertion order.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredPosition>> {
        if query.len() != self.dimension {
            return Err(Error::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut hits: Vec<ScoredPosition> = self
            .data
            .chunks_exact(self.dimension)
            .enumerate()
            .map(|(position, row)| ScoredPosition {
                position,
                score: dot(row, query),
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.position.cmp(&b.position))
        });
        hits.truncate(k);

        Ok(hits)
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
