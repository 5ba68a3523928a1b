use crate::embeddings::dot;
use crate::error::{Result, VectorStoreError};

/// Exact nearest-neighbour index over unit vectors.
///
/// Positions are insertion order; equal scores keep that order.
#[derive(Debug, Clone)]
pub struct FlatIndex {
    dimension: usize,
    vectors: Vec<Vec<f32>>,
}

impl FlatIndex {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            vectors: Vec::new(),
        }
    }

    pub const fn dimension(&self) -> usize {
        self.dimension
    }

    /// Append a vector, returning its position
    pub fn add(&mut self, vector: &[f32]) -> Result<usize> {
        if vector.len() != self.dimension {
            return Err(VectorStoreError::InvalidDimension {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        self.vectors.push(vector.to_vec());
        Ok(self.vectors.len() - 1)
    }

    /// Top `k` positions passing `keep`, by descending inner product.
    pub fn search_where(
        &self,
        query: &[f32],
        k: usize,
        keep: impl Fn(usize) -> bool,
    ) -> Result<Vec<(usize, f32)>> {
        if query.len() != self.dimension {
            return Err(VectorStoreError::InvalidDimension {
                expected: self.dimension,
                actual: query.len(),
            });
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut scores: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .filter(|(pos, _)| keep(*pos))
            .map(|(pos, vector)| (pos, dot(query, vector)))
            .collect();

        // sort_by is stable, so ties stay in insertion order
        scores.sort_by(|a, b| b.1.total_cmp(&a.1));
        scores.truncate(k);

        Ok(scores)
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }
}
