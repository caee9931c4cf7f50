//! Item catalog: the id <-> title bijection used for display and selection.
//!
//! Loaded once from a delimited text file (TSV by default) with a header row.
//! Both IDs and titles must be unique.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use std::time::Instant;

use crate::embedding::ItemId;

/// Column layout of a catalog file.
#[derive(Debug, Clone)]
pub struct CatalogFormat {
    pub delimiter: u8,
    pub id_column: String,
    pub title_column: String,
}

impl Default for CatalogFormat {
    fn default() -> Self {
        Self {
            delimiter: b'\t',
            id_column: "movie_id".to_string(),
            title_column: "title".to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("missing column {0:?}")]
    MissingColumn(String),

    #[error("line {line}: invalid item id {value:?}")]
    InvalidId { line: u64, value: String },

    #[error("duplicate item id {0}")]
    DuplicateId(ItemId),

    #[error("duplicate title {0:?}")]
    DuplicateTitle(String),

    #[error("no item titled {0:?}")]
    UnknownTitle(String),
}

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    /// IDs in file order
    order: Vec<ItemId>,
    id_to_title: HashMap<ItemId, String>,
    title_to_id: HashMap<String, ItemId>,
}

impl Catalog {
    /// Load a catalog file.
    pub fn load(path: &Path, format: &CatalogFormat) -> Result<Self, CatalogError> {
        let now = Instant::now();
        let file = std::fs::File::open(path)?;
        let catalog = Self::from_reader(file, format)?;

        log::debug!(
            "took {}ms to read catalog with {} items",
            now.elapsed().as_micros() as f64 / 1000.0,
            catalog.len()
        );

        Ok(catalog)
    }

    /// Parse a catalog from any reader.
    pub fn from_reader(reader: impl Read, format: &CatalogFormat) -> Result<Self, CatalogError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(format.delimiter)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        let column = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim() == name)
                .ok_or_else(|| CatalogError::MissingColumn(name.to_string()))
        };
        let id_idx = column(&format.id_column)?;
        let title_idx = column(&format.title_column)?;

        let mut catalog = Catalog::default();
        for record in csv_reader.records() {
            let record = record?;
            let line = record.position().map(|p| p.line()).unwrap_or_default();

            let raw_id = record.get(id_idx).unwrap_or_default().trim();
            let id = raw_id.parse::<ItemId>().map_err(|_| CatalogError::InvalidId {
                line,
                value: raw_id.to_string(),
            })?;
            let title = record.get(title_idx).unwrap_or_default().to_string();

            catalog.insert(id, title)?;
        }

        Ok(catalog)
    }

    /// Build a catalog from pairs, enforcing uniqueness.
    #[cfg(test)]
    pub fn from_pairs(
        pairs: impl IntoIterator<Item = (ItemId, String)>,
    ) -> Result<Self, CatalogError> {
        let mut catalog = Catalog::default();
        for (id, title) in pairs {
            catalog.insert(id, title)?;
        }
        Ok(catalog)
    }

    fn insert(&mut self, id: ItemId, title: String) -> Result<(), CatalogError> {
        if self.id_to_title.contains_key(&id) {
            return Err(CatalogError::DuplicateId(id));
        }
        if self.title_to_id.contains_key(&title) {
            return Err(CatalogError::DuplicateTitle(title));
        }

        self.order.push(id);
        self.title_to_id.insert(title.clone(), id);
        self.id_to_title.insert(id, title);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn title_of(&self, id: ItemId) -> Option<&str> {
        self.id_to_title.get(&id).map(String::as_str)
    }

    pub fn id_of(&self, title: &str) -> Option<ItemId> {
        self.title_to_id.get(title).copied()
    }

    /// (id, title) pairs in file order.
    pub fn iter(&self) -> impl Iterator<Item = (ItemId, &str)> {
        self.order
            .iter()
            .map(|id| (*id, self.id_to_title[id].as_str()))
    }

    /// Resolve user input to an item ID.
    ///
    /// An exact title wins; otherwise a numeric string is taken as an ID
    /// listed in the catalog.
    pub fn resolve(&self, input: &str) -> Result<ItemId, CatalogError> {
        if let Some(id) = self.id_of(input) {
            return Ok(id);
        }

        input
            .trim()
            .parse::<ItemId>()
            .ok()
            .filter(|id| self.id_to_title.contains_key(id))
            .ok_or_else(|| CatalogError::UnknownTitle(input.to_string()))
    }
}
