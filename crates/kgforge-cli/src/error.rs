//! Error types for the CLI application.

use thiserror::Error;

/// Result type alias for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Build error
    #[error(transparent)]
    Build(#[from] kgforge_builder::BuildError),

    /// Extraction service setup error
    #[error("Extraction service error: {0}")]
    Llm(#[from] kgforge_llm::LlmError),

    /// Artifact storage error
    #[error(transparent)]
    Store(#[from] kgforge_store::StoreError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
