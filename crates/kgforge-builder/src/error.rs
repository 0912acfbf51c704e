//! Error types for graph builds

use kgforge_extractor::ExtractorError;
use kgforge_graph::GraphError;
use kgforge_store::StoreError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during a build
///
/// Document-scoped variants (`NoChunks`, `Document`, `Cancelled`) are caught by
/// the [`ConcurrencyController`](crate::ConcurrencyController) and counted; they
/// never abort the batch.
#[derive(Error, Debug)]
pub enum BuildError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Dataset missing from the configuration
    #[error("Unknown dataset: {0}")]
    UnknownDataset(String),

    /// Corpus file could not be read or decoded
    #[error("Corpus error in {path}: {reason}")]
    Corpus {
        /// Corpus file
        path: PathBuf,
        /// What went wrong
        reason: String,
    },

    /// No chunk could be found for a document
    #[error("No chunks found for document {index}: {title}")]
    NoChunks {
        /// Document position in the corpus
        index: usize,
        /// Document title, `Unknown` when absent
        title: String,
    },

    /// A document could not be processed
    #[error("Error processing document {index}: {reason}")]
    Document {
        /// Document position in the corpus
        index: usize,
        /// What went wrong
        reason: String,
    },

    /// A document was abandoned after its deadline passed
    #[error("Document {index} cancelled")]
    Cancelled {
        /// Document position in the corpus
        index: usize,
    },

    /// Storage layer error
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    /// Graph error
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    /// Extractor setup error
    #[error("Extractor error: {0}")]
    Extractor(#[from] ExtractorError),
}
