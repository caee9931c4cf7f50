//! Embedding space and the recommendation query engine.
//!
//! # Architecture
//!
//! - `store`: In-memory vectors with cosine nearest-neighbour search
//! - `storage`: Binary file I/O for vectors.bin persistence
//! - `import`: word2vec text format reader
//! - `query`: Liked/disliked exemplars -> query vector
//! - `ranker`: Numbered, capped recommendation lists

pub mod import;
pub mod query;
pub mod ranker;
pub mod storage;
pub mod store;

pub use import::read_word2vec_text;
pub use query::{QueryComposer, QueryError, QuerySpec};
pub use ranker::{rank, RankedEntry};
pub use storage::{model_id_hash, VectorStorage};
pub use store::{EmbeddingStore, ItemId, StoreError};
