//! Recommendation facade and per-session paging.
//!
//! [`Recommender`] owns the shared, read-only embedding store and catalog.
//! A [`Session`] holds the caller's current exemplars, their ranked results
//! and the page cursor.

use std::sync::Arc;

use serde::Serialize;

use crate::catalog::{Catalog, CatalogError};
use crate::embedding::{
    rank, EmbeddingStore, ItemId, QueryComposer, QueryError, QuerySpec, RankedEntry, StoreError,
};
use crate::paginate::{self, CursorState, PageCursor};

#[derive(Debug, thiserror::Error)]
pub enum RecommendError {
    #[error(transparent)]
    Query(QueryError),

    /// A vocabulary item without a vector: the loaded files disagree.
    #[error("embedding store is inconsistent: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

impl From<QueryError> for RecommendError {
    fn from(err: QueryError) -> Self {
        match err {
            QueryError::Store(inner) => RecommendError::Store(inner),
            other => RecommendError::Query(other),
        }
    }
}

/// A ranked item with its display title.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendedItem {
    pub rank: usize,
    pub id: ItemId,
    pub title: String,
    pub score: f32,
}

/// One page of recommendations plus navigation state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultPage {
    pub items: Vec<RecommendedItem>,
    pub page: usize,
    pub pages: usize,
    pub total: usize,
    /// "page/pages", "0/0" when empty
    pub indicator: String,
    pub cursor: CursorState,
}

pub struct Recommender {
    store: Arc<EmbeddingStore>,
    catalog: Arc<Catalog>,
    max_results: usize,
    normalize_exemplars: bool,
}

impl Recommender {
    pub fn new(
        store: Arc<EmbeddingStore>,
        catalog: Arc<Catalog>,
        max_results: usize,
        normalize_exemplars: bool,
    ) -> Self {
        Self {
            store,
            catalog,
            max_results,
            normalize_exemplars,
        }
    }

    pub fn store(&self) -> &EmbeddingStore {
        &self.store
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Configured maximum, bounded by the vocabulary size.
    pub fn max_results(&self) -> usize {
        self.max_results.min(self.store.len())
    }

    /// Rank the vocabulary for `spec`, capped at `max_results`.
    ///
    /// An empty spec, or one whose exemplars cancel out, yields an empty
    /// list. Unknown IDs fail before anything is scored.
    pub fn recommend(
        &self,
        spec: &QuerySpec,
        max_results: usize,
    ) -> Result<Vec<RankedEntry>, RecommendError> {
        let _span = tracing::debug_span!(
            "recommend",
            liked = spec.positive.len(),
            disliked = spec.negative.len()
        )
        .entered();

        if spec.is_empty() {
            log::debug!("no exemplars selected, skipping query");
            return Ok(Vec::new());
        }

        let composer = QueryComposer::new(&self.store, self.normalize_exemplars);
        let query = composer.compose(spec).map_err(|err| {
            if let QueryError::Store(ref inner) = err {
                log::error!("vector lookup failed for a validated item: {inner}");
            }
            err
        })?;

        if query.is_degenerate() {
            log::warn!("exemplars cancel each other out, nothing to rank");
            return Ok(Vec::new());
        }

        let entries = rank(&self.store, &query.vector, &query.exclude, max_results).map_err(|err| {
            log::error!("ranking failed: {err}");
            err
        })?;

        log::debug!("ranked {} items", entries.len());

        Ok(entries)
    }

    /// Stateless single-page query over at most `max_results` entries.
    pub fn page(
        &self,
        spec: &QuerySpec,
        page_size: usize,
        page: usize,
        max_results: usize,
    ) -> Result<ResultPage, RecommendError> {
        let entries = self.recommend(spec, max_results)?;
        let cursor = PageCursor::at(page, paginate::page_count(entries.len(), page_size));
        Ok(self.build_page(&entries, page_size, cursor))
    }

    /// Map titles (or numeric IDs) to a [`QuerySpec`].
    pub fn resolve_spec<S: AsRef<str>>(
        &self,
        liked: &[S],
        disliked: &[S],
    ) -> Result<QuerySpec, RecommendError> {
        let resolve = |inputs: &[S]| {
            inputs
                .iter()
                .map(|s| self.catalog.resolve(s.as_ref()))
                .collect::<Result<Vec<_>, _>>()
        };

        Ok(QuerySpec::new(resolve(liked)?, resolve(disliked)?))
    }

    fn build_page(
        &self,
        entries: &[RankedEntry],
        page_size: usize,
        cursor: PageCursor,
    ) -> ResultPage {
        let items = paginate::window(entries, page_size, cursor.page())
            .iter()
            .map(|entry| RecommendedItem {
                rank: entry.rank,
                id: entry.id,
                title: self.display_title(entry.id),
                score: entry.score,
            })
            .collect();

        ResultPage {
            items,
            page: cursor.page(),
            pages: cursor.pages(),
            total: entries.len(),
            indicator: cursor.indicator(),
            cursor: cursor.state(),
        }
    }

    fn display_title(&self, id: ItemId) -> String {
        match self.catalog.title_of(id) {
            Some(title) => title.to_string(),
            None => {
                log::warn!("item {id} has a vector but no catalog entry");
                String::new()
            }
        }
    }
}

/// One caller's selection and paging position.
///
/// Results are kept only for the current spec; changing the spec
/// recomputes them and goes back to page 1.
pub struct Session<'a> {
    recommender: &'a Recommender,
    page_size: usize,
    spec: QuerySpec,
    results: Vec<RankedEntry>,
    cursor: PageCursor,
}

impl<'a> Session<'a> {
    pub fn new(recommender: &'a Recommender, page_size: usize) -> Self {
        Self {
            recommender,
            page_size,
            spec: QuerySpec::default(),
            results: Vec::new(),
            cursor: PageCursor::default(),
        }
    }

    /// Replace the exemplars.
    ///
    /// On error the previous spec and page stay untouched.
    pub fn set_spec(&mut self, spec: QuerySpec) -> Result<(), RecommendError> {
        if spec == self.spec && !self.results.is_empty() {
            return Ok(());
        }

        let results = self
            .recommender
            .recommend(&spec, self.recommender.max_results())?;

        self.cursor.reset(paginate::page_count(results.len(), self.page_size));
        self.results = results;
        self.spec = spec;
        Ok(())
    }

    pub fn next_page(&mut self) -> bool {
        self.cursor.next()
    }

    pub fn prev_page(&mut self) -> bool {
        self.cursor.prev()
    }

    pub fn current_page(&self) -> ResultPage {
        self.recommender
            .build_page(&self.results, self.page_size, self.cursor)
    }
}
