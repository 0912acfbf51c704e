//! Error types for the extractor

use thiserror::Error;

/// Errors that can occur while preparing extraction work
#[derive(Error, Debug)]
pub enum ExtractorError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Why a response could not be turned into JSON
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Nothing that looks like JSON in the text
    #[error("no JSON value found in response")]
    NoJson,

    /// JSON-like content that survived no repair
    #[error("unrepairable JSON: {0}")]
    Unrepairable(String),
}
