//! Ranked recommendation lists on top of [`EmbeddingStore::nearest_to`].

use std::collections::HashSet;

use serde::Serialize;

use crate::embedding::store::{EmbeddingStore, ItemId, StoreError};

/// One line of a recommendation list.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RankedEntry {
    /// 1-based position in the list
    pub rank: usize,
    pub id: ItemId,
    /// Cosine similarity to the query
    pub score: f32,
}

/// Rank the vocabulary against `query`, skipping `exclude`.
///
/// Returns at most `max_results` entries numbered from 1. A vocabulary
/// smaller than `max_results` simply yields a shorter list.
pub fn rank(
    store: &EmbeddingStore,
    query: &[f32],
    exclude: &HashSet<ItemId>,
    max_results: usize,
) -> Result<Vec<RankedEntry>, StoreError> {
    let neighbors = store.nearest_to(query, exclude, max_results)?;

    Ok(neighbors
        .into_iter()
        .enumerate()
        .map(|(idx, n)| RankedEntry {
            rank: idx + 1,
            id: n.id,
            score: n.score,
        })
        .collect())
}
