//! kgforge Builder
//!
//! Runs a whole knowledge-graph build for one dataset: configuration, corpus
//! loading, the concurrent extraction phase, and the post-processing that turns
//! the assembled graph into the exported relationship list.
//!
//! # Architecture
//!
//! ```text
//! corpus.json → Documents → chunk phase ─→ chunks/<dataset>.txt
//!                               │
//!              ConcurrencyController (Semaphore + JoinSet, timeouts)
//!                               │
//!                BuildSession per worker: prompt → service → validate
//!                               │          (agent: SchemaEvolutionManager)
//!                               ▼
//!                     SharedGraph → dedup → communities → <dataset>_new.json
//! ```
//!
//! # Key Features
//!
//! - **Bounded concurrency**: at most `max_workers` documents in flight
//! - **Failure isolation**: a failed or late document never cancels its siblings
//! - **Deadlines**: per-document and whole-batch timeouts with cooperative cancellation
//! - **Schema evolution**: agent builds grow the dataset schema file as they go
//! - **Build report**: counts, token cost and graph sizes in one summary
//!
//! # Example Usage
//!
//! ```
//! use kgforge_builder::{parse_corpus, BuildConfig, ConcurrencyController};
//!
//! let config = BuildConfig::fast();
//! assert!(config.validate().is_ok());
//!
//! let documents = parse_corpus(r#"[{"title": "AHU-1", "text": "Serves level 3."}]"#).unwrap();
//! assert_eq!(documents.len(), 1);
//!
//! let controller = ConcurrencyController::new(
//!     config.construction.workers(),
//!     config.construction.document_timeout(),
//!     config.construction.batch_timeout(),
//! );
//! assert!(controller.workers() >= 1);
//! ```

#![warn(missing_docs)]

mod builder;
mod config;
mod controller;
mod corpus;
mod error;
mod metrics;
mod schema_evolution;
mod session;

pub use builder::{BuildOutput, ChunkingOutput, GraphBuilder};
pub use config::{
    BuildConfig, CommunityConfig, ConstructionConfig, ConstructionMode, DatasetConfig, LlmConfig,
    OutputConfig,
};
pub use controller::{
    BatchReport, ChunkingReport, ConcurrencyController, DocumentFailure, DocumentOutcome,
};
pub use corpus::{load_corpus, parse_corpus};
pub use error::BuildError;
pub use metrics::{estimate_tokens, BuildMetrics};
pub use schema_evolution::SchemaEvolutionManager;
pub use session::{BuildSession, DocumentStats, SessionTotals};
