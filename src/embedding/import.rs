//! Import of embeddings exported in word2vec text format.
//!
//! ```text
//! <count> <dimensions>
//! <item_id> <v1> <v2> ... <vd>
//! ```
//!
//! Item keys must be numeric IDs. Lines keep their order, which becomes the
//! vocabulary order of the resulting store.

use std::io::BufRead;

use indicatif::ProgressBar;

use crate::embedding::store::{EmbeddingStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed header: {0:?}")]
    MalformedHeader(String),

    #[error("line {line}: {reason}")]
    MalformedLine { line: usize, reason: String },

    #[error("header announced {expected} vectors, found {got}")]
    CountMismatch { expected: usize, got: usize },

    #[error("line {line}: {source}")]
    Store {
        line: usize,
        #[source]
        source: StoreError,
    },
}

/// Parse a word2vec text export into an [`EmbeddingStore`].
///
/// `progress` is advanced once per vector line.
pub fn read_word2vec_text(
    reader: impl BufRead,
    progress: &ProgressBar,
) -> Result<EmbeddingStore, ImportError> {
    let mut lines = reader.lines();

    let header = lines
        .next()
        .transpose()?
        .ok_or_else(|| ImportError::MalformedHeader(String::new()))?;
    let (count, dimensions) = parse_header(&header)?;

    progress.set_length(count as u64);

    let mut store = EmbeddingStore::with_capacity(dimensions, count);
    let mut skipped = 0usize;
    let mut seen = 0usize;

    for (n, line) in lines.enumerate() {
        let line_no = n + 2;
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        seen += 1;

        let mut parts = line.split_whitespace();
        let key = parts.next().unwrap_or_default();
        let id = key.parse::<u64>().map_err(|_| ImportError::MalformedLine {
            line: line_no,
            reason: format!("item key {key:?} is not a numeric id"),
        })?;

        let vector = parts
            .map(|value| value.parse::<f32>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| ImportError::MalformedLine {
                line: line_no,
                reason: err.to_string(),
            })?;

        match store.insert(id, vector) {
            Ok(()) => {}
            Err(StoreError::ZeroNormVector(id)) => {
                log::warn!("line {line_no}: skipping item {id}, zero-norm vector");
                skipped += 1;
            }
            Err(source) => {
                return Err(ImportError::Store {
                    line: line_no,
                    source,
                })
            }
        }

        progress.inc(1);
    }

    if seen != count {
        return Err(ImportError::CountMismatch {
            expected: count,
            got: seen,
        });
    }

    if skipped > 0 {
        log::warn!("{skipped} of {count} vectors skipped");
    }

    Ok(store)
}

fn parse_header(header: &str) -> Result<(usize, usize), ImportError> {
    let malformed = || ImportError::MalformedHeader(header.to_string());

    let mut parts = header.split_whitespace();
    let count = parts
        .next()
        .and_then(|v| v.parse::<usize>().ok())
        .ok_or_else(malformed)?;
    let dimensions = parts
        .next()
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|&d| d > 0)
        .ok_or_else(malformed)?;

    if parts.next().is_some() {
        return Err(malformed());
    }

    Ok((count, dimensions))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn import(text: &str) -> Result<EmbeddingStore, ImportError> {
        read_word2vec_text(Cursor::new(text), &ProgressBar::hidden())
    }

    #[test]
    fn test_reads_vectors_in_file_order() {
        let store = import("3 2\n318 0.5 1.0\n1 -1.0 0.25\n2571 0.0 1.0\n").unwrap();

        assert_eq!(store.dimensions(), 2);
        assert_eq!(store.ids().collect::<Vec<_>>(), vec![318, 1, 2571]);
        assert_eq!(store.vector_of(1).unwrap(), &[-1.0, 0.25]);
    }

    #[test]
    fn test_rejects_bad_header() {
        assert!(matches!(import("3\n"), Err(ImportError::MalformedHeader(_))));
        assert!(matches!(import("x 2\n"), Err(ImportError::MalformedHeader(_))));
        assert!(matches!(import("1 0\n"), Err(ImportError::MalformedHeader(_))));
        assert!(matches!(import(""), Err(ImportError::MalformedHeader(_))));
    }

    #[test]
    fn test_rejects_non_numeric_key() {
        let result = import("1 2\nthe_matrix 0.1 0.2\n");
        assert!(matches!(result, Err(ImportError::MalformedLine { line: 2, .. })));
    }

    #[test]
    fn test_rejects_wrong_width() {
        let result = import("2 2\n1 0.1 0.2\n2 0.1 0.2 0.3\n");
        assert!(matches!(
            result,
            Err(ImportError::Store {
                line: 3,
                source: StoreError::DimensionMismatch { .. }
            })
        ));
    }

    #[test]
    fn test_rejects_count_mismatch() {
        let result = import("3 2\n1 0.1 0.2\n2 0.3 0.4\n");
        assert!(matches!(
            result,
            Err(ImportError::CountMismatch { expected: 3, got: 2 })
        ));
    }

    #[test]
    fn test_huge_header_count_is_count_mismatch() {
        let result = import("18446744073709551615 2\n1 0.1 0.2\n");
        assert!(matches!(
            result,
            Err(ImportError::CountMismatch {
                expected: usize::MAX,
                got: 1
            })
        ));
    }

    #[test]
    fn test_skips_zero_vectors() {
        let store = import("2 2\n1 0 0\n2 1 0\n").unwrap();
        assert_eq!(store.len(), 1);
        assert!(!store.contains(1));
    }
}
