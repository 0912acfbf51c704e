//! kgforge Storage Layer
//!
//! Build-scoped storage for chunks and the file artifacts a build reads and writes.
//!
//! # Architecture
//!
//! - [`ChunkStore`]: chunk id to text, plus the document to chunk-id index
//! - [`ChunkFile`]: the line-oriented chunk artifact (`id: <id>\tChunk: <text>`)
//! - [`SchemaFile`]: per-dataset schema JSON
//!
//! The chunk store is filled by the chunking phase through `&mut self` and then
//! frozen behind an `Arc` for the extraction phase, so readers never take a lock.
//!
//! # Examples
//!
//! ```
//! use kgforge_store::ChunkStore;
//!
//! let mut store = ChunkStore::new();
//! let id = store.register("Pump P-101 is located in B1.").unwrap();
//! store.record_document(0, vec![id.clone()]);
//!
//! assert_eq!(store.get(&id), Some("Pump P-101 is located in B1."));
//! assert_eq!(store.chunks_for_document(0, "").len(), 1);
//! ```

#![warn(missing_docs)]

pub mod chunk_file;
pub mod chunk_store;
pub mod schema_file;

pub use chunk_file::ChunkFile;
pub use chunk_store::ChunkStore;
pub use schema_file::SchemaFile;

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Filesystem error
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Invalid JSON in a stored artifact
    #[error("Invalid JSON in {path}: {source}")]
    Json {
        /// File involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: serde_json::Error,
    },

    /// Every identifier drawn for a chunk collided with an existing one
    #[error("Could not allocate a unique chunk id after {0} attempts")]
    ChunkIdExhausted(usize),

    /// An identifier was inserted twice
    #[error("Duplicate chunk id: {0}")]
    DuplicateChunkId(String),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        StoreError::Json {
            path: path.into(),
            source,
        }
    }
}
