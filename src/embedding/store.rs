//! In-memory embedding store with cosine similarity search.
//!
//! Holds one vector per vocabulary item, in vocabulary insertion order.
//! The store is filled once at load time and only read afterwards.

use std::collections::{HashMap, HashSet};

use rayon::prelude::*;

/// Stable identifier of a vocabulary item.
pub type ItemId = u64;

/// Below this many items scoring stays on the calling thread.
const PARALLEL_MIN_LEN: usize = 4096;

/// Upper bound on up-front allocation; capacities come from file headers.
const MAX_RESERVED: usize = 1 << 16;

/// A scored vocabulary item returned by [`EmbeddingStore::nearest_to`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Item ID
    pub id: ItemId,
    /// Cosine similarity score (-1.0 to 1.0)
    pub score: f32,
}

/// Fixed-dimension vectors keyed by item ID.
///
/// Insertion order is kept: it is the tie-breaker when two items score the
/// same, which keeps rankings reproducible.
#[derive(Debug, Clone)]
pub struct EmbeddingStore {
    /// Item IDs in insertion order
    ids: Vec<ItemId>,
    /// Item ID -> slot in `ids`/`vectors`/`norms`
    slots: HashMap<ItemId, usize>,
    vectors: Vec<Vec<f32>>,
    /// Precomputed L2 norms, one per slot
    norms: Vec<f32>,
    dimensions: usize,
}

impl EmbeddingStore {
    /// Create a new empty store with specified dimensions.
    #[cfg(test)]
    pub fn new(dimensions: usize) -> Self {
        Self::with_capacity(dimensions, 0)
    }

    /// Create a store with pre-allocated capacity.
    ///
    /// The reservation is capped; larger stores grow on insert.
    pub fn with_capacity(dimensions: usize, capacity: usize) -> Self {
        let capacity = capacity.min(MAX_RESERVED);
        Self {
            ids: Vec::with_capacity(capacity),
            slots: HashMap::with_capacity(capacity),
            vectors: Vec::with_capacity(capacity),
            norms: Vec::with_capacity(capacity),
            dimensions,
        }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Vocabulary size.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Append an item to the vocabulary.
    ///
    /// Rejects wrong dimensions, zero-norm vectors and IDs already present.
    /// An existing entry is never overwritten since that would silently
    /// change the tie-break order.
    pub fn insert(&mut self, id: ItemId, vector: Vec<f32>) -> Result<(), StoreError> {
        if vector.len() != self.dimensions {
            return Err(StoreError::DimensionMismatch {
                expected: self.dimensions,
                got: vector.len(),
            });
        }

        let norm = l2_norm(&vector);
        if !norm.is_finite() || norm < f32::EPSILON {
            return Err(StoreError::ZeroNormVector(id));
        }

        if self.slots.contains_key(&id) {
            return Err(StoreError::DuplicateId(id));
        }

        self.slots.insert(id, self.ids.len());
        self.ids.push(id);
        self.vectors.push(vector);
        self.norms.push(norm);

        Ok(())
    }

    /// Check if an item is part of the vocabulary.
    pub fn contains(&self, id: ItemId) -> bool {
        self.slots.contains_key(&id)
    }

    /// Look up the vector of an item.
    pub fn vector_of(&self, id: ItemId) -> Result<&[f32], StoreError> {
        self.slots
            .get(&id)
            .map(|&slot| self.vectors[slot].as_slice())
            .ok_or(StoreError::NotFound(id))
    }

    /// Precomputed L2 norm of an item's vector.
    pub fn norm_of(&self, id: ItemId) -> Result<f32, StoreError> {
        self.slots
            .get(&id)
            .map(|&slot| self.norms[slot])
            .ok_or(StoreError::NotFound(id))
    }

    /// Item IDs in insertion order.
    pub fn ids(&self) -> impl Iterator<Item = ItemId> + '_ {
        self.ids.iter().copied()
    }

    /// Iterate over all entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (ItemId, &[f32])> {
        self.ids
            .iter()
            .zip(self.vectors.iter())
            .map(|(id, v)| (*id, v.as_slice()))
    }

    /// Rank the vocabulary by cosine similarity to `query`.
    ///
    /// Every item except those in `exclude` is scored. Results are sorted by
    /// score, highest first; equal scores keep insertion order. At most
    /// `top_n` results are returned.
    pub fn nearest_to(
        &self,
        query: &[f32],
        exclude: &HashSet<ItemId>,
        top_n: usize,
    ) -> Result<Vec<Neighbor>, StoreError> {
        if query.len() != self.dimensions {
            return Err(StoreError::DimensionMismatch {
                expected: self.dimensions,
                got: query.len(),
            });
        }

        let query_norm = l2_norm(query);
        if !query_norm.is_finite() || query_norm < f32::EPSILON {
            return Err(StoreError::ZeroQueryVector);
        }

        if top_n == 0 {
            return Ok(Vec::new());
        }

        // indexed collect keeps slot order regardless of thread scheduling
        let mut results: Vec<Neighbor> = (0..self.ids.len())
            .into_par_iter()
            .with_min_len(PARALLEL_MIN_LEN)
            .filter(|&slot| !exclude.contains(&self.ids[slot]))
            .map(|slot| Neighbor {
                id: self.ids[slot],
                score: cosine_similarity_with_norms(
                    query,
                    &self.vectors[slot],
                    query_norm,
                    self.norms[slot],
                ),
            })
            .collect();

        // stable: ties stay in insertion order
        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results.truncate(top_n);

        Ok(results)
    }
}

/// Compute L2 norm of a vector.
pub fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Cosine similarity between two vectors. Zero if either has zero norm.
#[cfg(test)]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    cosine_similarity_with_norms(a, b, l2_norm(a), l2_norm(b))
}

fn cosine_similarity_with_norms(a: &[f32], b: &[f32], norm_a: f32, norm_b: f32) -> f32 {
    if norm_a < f32::EPSILON || norm_b < f32::EPSILON {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    (dot_product / (norm_a * norm_b)).clamp(-1.0, 1.0)
}

/// Errors that can occur during store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("no vector for item {0}")]
    NotFound(ItemId),

    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("item {0} has a zero-norm vector")]
    ZeroNormVector(ItemId),

    #[error("cannot rank against a zero-norm query vector")]
    ZeroQueryVector,

    #[error("item {0} is already in the vocabulary")]
    DuplicateId(ItemId),
}
