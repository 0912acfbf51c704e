//! kgforge Extractor
//!
//! Everything between a raw document and a validated extraction result.
//!
//! # Architecture
//!
//! ```text
//! Document → ChunkSplitter → ChunkStore
//! Chunk + Schema → PromptBuilder → extraction service → ResponseValidator → Extraction
//! ```
//!
//! # Key Features
//!
//! - **Structural splitting**: heading cascade (`####`, `###`, `##`) with
//!   overlapping length windows for long segments
//! - **Smart merging**: keyword-similarity grouping when a document yields too many chunks
//! - **Lenient parsing**: JSON repair, list/string/scalar handling, shape coercion
//! - **Relation vocabulary**: source relation labels mapped to canonical schema names
//! - **Hierarchy synthesis**: floor and location-code relations for building assets
//!
//! # Example Usage
//!
//! ```
//! use kgforge_extractor::{ChunkSplitter, PromptBuilder, PromptStyle, ResponseValidator, SplitterConfig};
//! use kgforge_domain::{Document, Schema};
//! use kgforge_store::ChunkStore;
//!
//! let splitter = ChunkSplitter::new(SplitterConfig::default()).unwrap();
//! let mut store = ChunkStore::new();
//! let doc = Document::record("Plant room", "## AHU-1\nServes level 3.\n## P-1\nFeeds AHU-1.");
//! let chunks = splitter.split_into(&doc, 0, &mut store);
//!
//! let prompt = PromptBuilder::new(PromptStyle::General).build(&Schema::default(), &chunks.texts[0]);
//! assert!(prompt.contains("Plant room"));
//!
//! let outcome = ResponseValidator::new().validate(Some(r#"{"triples": [["P-1", "供应", "AHU-1"]]}"#));
//! assert_eq!(outcome.into_extraction().triples[0][1], "supplies");
//! ```

#![warn(missing_docs)]

mod chunking;
mod config;
mod error;
mod prompt;
mod relations;
mod repair;
mod validator;

pub use chunking::{ChunkSplitter, DocumentChunks};
pub use config::SplitterConfig;
pub use error::{ExtractorError, ParseError};
pub use prompt::{PromptBuilder, PromptStyle};
pub use relations::{
    canonical_relation, floor_from_location, normalize_floor_name, normalize_relations,
    synthesize_hierarchy,
};
pub use repair::repair;
pub use validator::{ParseOutcome, ResponseValidator};
