//! Composition of liked/disliked exemplars into a single query vector.
//!
//! The query is the analogy-style sum `Σ positive - Σ negative`. Each
//! exemplar can be unit-normalized first so that long vectors do not drown
//! out short ones.
//!
//! An item listed as both positive and negative contributes `+v - v`, i.e.
//! nothing, and is still excluded from the results.

use std::collections::{BTreeSet, HashSet};

use crate::embedding::store::{EmbeddingStore, ItemId, StoreError};

/// Liked and disliked items of one recommendation request.
///
/// Ordered sets: summation order, and therefore the exact query vector, is
/// the same for equal specs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuerySpec {
    pub positive: BTreeSet<ItemId>,
    pub negative: BTreeSet<ItemId>,
}

impl QuerySpec {
    pub fn new(
        positive: impl IntoIterator<Item = ItemId>,
        negative: impl IntoIterator<Item = ItemId>,
    ) -> Self {
        Self {
            positive: positive.into_iter().collect(),
            negative: negative.into_iter().collect(),
        }
    }

    /// No exemplars at all: there is nothing to query for.
    pub fn is_empty(&self) -> bool {
        self.positive.is_empty() && self.negative.is_empty()
    }

    /// Items used as exemplars, which never appear in their own results.
    pub fn exemplars(&self) -> HashSet<ItemId> {
        self.positive.union(&self.negative).copied().collect()
    }
}

/// Output of [`QueryComposer::compose`].
#[derive(Debug, Clone)]
pub struct ComposedQuery {
    pub vector: Vec<f32>,
    pub exclude: HashSet<ItemId>,
}

impl ComposedQuery {
    /// True when the exemplars cancelled out to (almost) nothing.
    pub fn is_degenerate(&self) -> bool {
        let norm = crate::embedding::store::l2_norm(&self.vector);
        !norm.is_finite() || norm < f32::EPSILON
    }
}

#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("unknown items: {}", format_ids(.unknown))]
    InvalidInput { unknown: Vec<ItemId> },

    /// Callers must not compose a query without exemplars.
    #[error("no positive or negative items given")]
    EmptyQuery,

    #[error(transparent)]
    Store(#[from] StoreError),
}

fn format_ids(ids: &[ItemId]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

pub struct QueryComposer<'a> {
    store: &'a EmbeddingStore,
    normalize_exemplars: bool,
}

impl<'a> QueryComposer<'a> {
    pub fn new(store: &'a EmbeddingStore, normalize_exemplars: bool) -> Self {
        Self {
            store,
            normalize_exemplars,
        }
    }

    /// Validate `spec` against the vocabulary and build the query vector.
    ///
    /// Every unknown ID is reported at once in [`QueryError::InvalidInput`].
    /// An empty spec is a caller bug and yields [`QueryError::EmptyQuery`]
    /// rather than a zero vector.
    pub fn compose(&self, spec: &QuerySpec) -> Result<ComposedQuery, QueryError> {
        if spec.is_empty() {
            return Err(QueryError::EmptyQuery);
        }

        let unknown: Vec<ItemId> = spec
            .positive
            .iter()
            .chain(spec.negative.iter())
            .copied()
            .filter(|id| !self.store.contains(*id))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if !unknown.is_empty() {
            return Err(QueryError::InvalidInput { unknown });
        }

        let mut vector = vec![0.0f32; self.store.dimensions()];
        for &id in &spec.positive {
            self.accumulate(&mut vector, id, 1.0)?;
        }
        for &id in &spec.negative {
            self.accumulate(&mut vector, id, -1.0)?;
        }

        Ok(ComposedQuery {
            vector,
            exclude: spec.exemplars(),
        })
    }

    fn accumulate(&self, acc: &mut [f32], id: ItemId, sign: f32) -> Result<(), StoreError> {
        let exemplar = self.store.vector_of(id)?;
        let weight = if self.normalize_exemplars {
            sign / self.store.norm_of(id)?
        } else {
            sign
        };

        for (a, v) in acc.iter_mut().zip(exemplar) {
            *a += weight * v;
        }
        Ok(())
    }
}
