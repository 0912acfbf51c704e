//! Graph error types

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while assembling or exporting a graph
#[derive(Error, Debug)]
pub enum GraphError {
    /// A worker panicked while holding the graph lock
    #[error("Graph lock poisoned")]
    Poisoned,

    /// An edge endpoint is not in the graph
    #[error("Unknown node: {0}")]
    UnknownNode(String),

    /// Community detection failed
    #[error("Community detection failed: {0}")]
    Community(String),

    /// Export file could not be written
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Export records could not be serialized
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
