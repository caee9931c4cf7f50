//! Binary storage for embedding stores.
//!
//! File format: vectors.bin
//!
//! Header (47 bytes):
//! - version: u8 (1)
//! - model_id: [u8; 32] (SHA256 hash of model name)
//! - dimensions: u16 (little-endian)
//! - entry_count: u64 (little-endian)
//! - checksum: u32 (CRC32 of header fields before checksum)
//!
//! Entries (repeated, in vocabulary order):
//! - item_id: u64 (little-endian)
//! - vector: [f32; dimensions] (little-endian)

use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use sha2::{Digest, Sha256};

use crate::embedding::store::{EmbeddingStore, ItemId, StoreError};

/// Current file format version
const FORMAT_VERSION: u8 = 1;

/// Header size in bytes: version(1) + model_id(32) + dimensions(2) + entry_count(8) + checksum(4)
const HEADER_SIZE: usize = 47;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum VectorStorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid file format: {0}")]
    InvalidFormat(String),

    #[error("Version mismatch: file version {0}, supported version {1}")]
    VersionMismatch(u8, u8),

    #[error("Model mismatch: file uses different model")]
    ModelMismatch,

    #[error("Checksum mismatch: file may be corrupted")]
    ChecksumMismatch,

    #[error("Invalid entry: {0}")]
    Entry(#[from] StoreError),
}

/// SHA256 of a model name, stored in the header to detect mixed-up files.
pub fn model_id_hash(model_name: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(model_name.as_bytes());
    hasher.finalize().into()
}

/// Storage manager for embedding vectors.
pub struct VectorStorage {
    path: PathBuf,
}

impl VectorStorage {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load an embedding store from disk.
    ///
    /// The dimensionality comes from the file header. Vocabulary order is
    /// the order entries were written in.
    pub fn load(&self, expected_model_id: &[u8; 32]) -> Result<EmbeddingStore, VectorStorageError> {
        let now = Instant::now();
        let file = File::open(&self.path)?;
        let mut reader = BufReader::new(file);

        let header = read_header(&mut reader)?;
        if header.model_id != *expected_model_id {
            return Err(VectorStorageError::ModelMismatch);
        }
        if header.dimensions == 0 {
            return Err(VectorStorageError::InvalidFormat(
                "zero-dimension vectors".to_string(),
            ));
        }

        let dimensions = header.dimensions as usize;
        let mut store = EmbeddingStore::with_capacity(dimensions, header.entry_count as usize);

        for n in 0..header.entry_count {
            let (id, vector) = read_entry(&mut reader, dimensions).map_err(|err| match err {
                VectorStorageError::Io(io) if io.kind() == ErrorKind::UnexpectedEof => {
                    VectorStorageError::InvalidFormat(format!(
                        "truncated after {n} of {} entries",
                        header.entry_count
                    ))
                }
                other => other,
            })?;

            match store.insert(id, vector) {
                Ok(()) => {}
                // a zero vector carries no direction; leave the item out
                Err(StoreError::ZeroNormVector(id)) => {
                    log::warn!("skipping item {id}: zero-norm vector");
                }
                Err(err) => return Err(err.into()),
            }
        }

        log::debug!(
            "took {}ms to load {} vectors",
            now.elapsed().as_micros() as f64 / 1000.0,
            store.len()
        );

        Ok(store)
    }

    /// Save the store to disk.
    ///
    /// Uses atomic write: temp file -> fsync -> rename
    pub fn save(&self, store: &EmbeddingStore, model_id: &[u8; 32]) -> Result<(), VectorStorageError> {
        let dimensions = u16::try_from(store.dimensions()).map_err(|_| {
            VectorStorageError::InvalidFormat(format!(
                "{} dimensions do not fit the header",
                store.dimensions()
            ))
        })?;

        let temp_path = self.path.with_extension("tmp");

        let result = write_to_file(&temp_path, store, dimensions, model_id);
        if result.is_err() {
            let _ = std::fs::remove_file(&temp_path);
            return result;
        }

        std::fs::rename(&temp_path, &self.path)?;

        Ok(())
    }
}

fn write_to_file(
    path: &Path,
    store: &EmbeddingStore,
    dimensions: u16,
    model_id: &[u8; 32],
) -> Result<(), VectorStorageError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    let header = Header {
        version: FORMAT_VERSION,
        model_id: *model_id,
        dimensions,
        entry_count: store.len() as u64,
    };
    write_header(&mut writer, &header)?;

    for (id, vector) in store.iter() {
        write_entry(&mut writer, id, vector)?;
    }

    writer.flush()?;
    let file = writer.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()?;

    Ok(())
}

fn read_header(reader: &mut impl Read) -> Result<Header, VectorStorageError> {
    let mut header_bytes = [0u8; HEADER_SIZE];
    reader.read_exact(&mut header_bytes).map_err(|err| {
        if err.kind() == ErrorKind::UnexpectedEof {
            VectorStorageError::InvalidFormat("file shorter than header".to_string())
        } else {
            err.into()
        }
    })?;

    let version = header_bytes[0];
    if version == 0 || version > FORMAT_VERSION {
        return Err(VectorStorageError::VersionMismatch(version, FORMAT_VERSION));
    }

    let mut model_id = [0u8; 32];
    model_id.copy_from_slice(&header_bytes[1..33]);

    let dimensions = u16::from_le_bytes([header_bytes[33], header_bytes[34]]);

    let mut count_bytes = [0u8; 8];
    count_bytes.copy_from_slice(&header_bytes[35..43]);
    let entry_count = u64::from_le_bytes(count_bytes);

    let mut checksum_bytes = [0u8; 4];
    checksum_bytes.copy_from_slice(&header_bytes[43..47]);
    let stored_checksum = u32::from_le_bytes(checksum_bytes);

    if stored_checksum != crc32fast::hash(&header_bytes[0..43]) {
        return Err(VectorStorageError::ChecksumMismatch);
    }

    Ok(Header {
        version,
        model_id,
        dimensions,
        entry_count,
    })
}

fn write_header(writer: &mut impl Write, header: &Header) -> Result<(), VectorStorageError> {
    let mut header_bytes = [0u8; HEADER_SIZE];

    header_bytes[0] = header.version;
    header_bytes[1..33].copy_from_slice(&header.model_id);
    header_bytes[33..35].copy_from_slice(&header.dimensions.to_le_bytes());
    header_bytes[35..43].copy_from_slice(&header.entry_count.to_le_bytes());

    let checksum = crc32fast::hash(&header_bytes[0..43]);
    header_bytes[43..47].copy_from_slice(&checksum.to_le_bytes());

    writer.write_all(&header_bytes)?;
    Ok(())
}

fn read_entry(
    reader: &mut impl Read,
    dimensions: usize,
) -> Result<(ItemId, Vec<f32>), VectorStorageError> {
    let mut id_bytes = [0u8; 8];
    reader.read_exact(&mut id_bytes)?;
    let id = u64::from_le_bytes(id_bytes);

    let mut vector = Vec::with_capacity(dimensions);
    for _ in 0..dimensions {
        let mut float_bytes = [0u8; 4];
        reader.read_exact(&mut float_bytes)?;
        vector.push(f32::from_le_bytes(float_bytes));
    }

    Ok((id, vector))
}

fn write_entry(writer: &mut impl Write, id: ItemId, vector: &[f32]) -> Result<(), VectorStorageError> {
    writer.write_all(&id.to_le_bytes())?;
    for &value in vector {
        writer.write_all(&value.to_le_bytes())?;
    }
    Ok(())
}

#[derive(Debug)]
struct Header {
    version: u8,
    model_id: [u8; 32],
    dimensions: u16,
    entry_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Seek, SeekFrom};

    fn test_model_id() -> [u8; 32] {
        model_id_hash("i2v-test")
    }

    fn sample_store() -> EmbeddingStore {
        let mut store = EmbeddingStore::new(3);
        store.insert(42, vec![1.0, 0.0, 0.0]).unwrap();
        store.insert(7, vec![0.0, 1.0, 0.0]).unwrap();
        store.insert(19, vec![0.0, 0.5, 1.0]).unwrap();
        store
    }

    #[test]
    fn test_save_and_load_preserves_order_and_values() {
        let dir = tempfile::tempdir().unwrap();
        let storage = VectorStorage::new(dir.path().join("vectors.bin"));
        let model_id = test_model_id();

        storage.save(&sample_store(), &model_id).unwrap();
        assert!(storage.exists());

        let loaded = storage.load(&model_id).unwrap();
        assert_eq!(loaded.dimensions(), 3);
        assert_eq!(loaded.ids().collect::<Vec<_>>(), vec![42, 7, 19]);
        assert_eq!(loaded.vector_of(19).unwrap(), &[0.0, 0.5, 1.0]);
    }

    #[test]
    fn test_model_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let storage = VectorStorage::new(dir.path().join("vectors.bin"));
        storage.save(&sample_store(), &test_model_id()).unwrap();

        let result = storage.load(&model_id_hash("another-model"));
        assert!(matches!(result, Err(VectorStorageError::ModelMismatch)));
    }

    #[test]
    fn test_atomic_write_cleans_up_on_error() {
        let path = PathBuf::from("/nonexistent/directory/vectors.bin");
        let storage = VectorStorage::new(path.clone());

        let result = storage.save(&sample_store(), &test_model_id());

        assert!(result.is_err());
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn test_checksum_detects_corruption() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vectors.bin");
        let storage = VectorStorage::new(path.clone());
        let model_id = test_model_id();
        storage.save(&sample_store(), &model_id).unwrap();

        let mut file = std::fs::OpenOptions::new().write(true).open(&path).unwrap();
        file.seek(SeekFrom::Start(10)).unwrap();
        file.write_all(&[0xFF]).unwrap();
        drop(file);

        let result = storage.load(&model_id);
        assert!(matches!(result, Err(VectorStorageError::ChecksumMismatch)));
    }

    #[test]
    fn test_truncated_file_is_invalid_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vectors.bin");
        let storage = VectorStorage::new(path.clone());
        let model_id = test_model_id();
        storage.save(&sample_store(), &model_id).unwrap();

        let len = std::fs::metadata(&path).unwrap().len();
        let file = std::fs::OpenOptions::new().write(true).open(&path).unwrap();
        file.set_len(len - 6).unwrap();
        drop(file);

        let result = storage.load(&model_id);
        assert!(matches!(result, Err(VectorStorageError::InvalidFormat(_))));
    }

    fn write_raw(path: &Path, entry_count: u64, entries: &[(ItemId, [f32; 2])]) {
        let mut file = File::create(path).unwrap();
        let header = Header {
            version: FORMAT_VERSION,
            model_id: test_model_id(),
            dimensions: 2,
            entry_count,
        };
        write_header(&mut file, &header).unwrap();
        for (id, vector) in entries {
            write_entry(&mut file, *id, vector).unwrap();
        }
    }

    #[test]
    fn test_huge_entry_count_is_invalid_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vectors.bin");
        write_raw(&path, u64::MAX, &[(1, [0.1, 0.2])]);

        let result = VectorStorage::new(path).load(&test_model_id());
        assert!(matches!(result, Err(VectorStorageError::InvalidFormat(_))));
    }

    #[test]
    fn test_load_skips_zero_vectors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vectors.bin");
        write_raw(&path, 3, &[(1, [0.0, 0.0]), (2, [1.0, 0.0]), (3, [0.0, 1.0])]);

        let store = VectorStorage::new(path).load(&test_model_id()).unwrap();
        assert_eq!(store.ids().collect::<Vec<_>>(), vec![2, 3]);
        assert!(!store.contains(1));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let storage = VectorStorage::new(dir.path().join("absent.bin"));

        assert!(!storage.exists());
        assert!(matches!(
            storage.load(&test_model_id()),
            Err(VectorStorageError::Io(_))
        ));
    }

    #[test]
    fn test_model_id_hash_is_stable() {
        assert_eq!(model_id_hash("i2v"), model_id_hash("i2v"));
        assert_ne!(model_id_hash("i2v"), model_id_hash("i2v-2"));
    }
}
