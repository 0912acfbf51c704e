//! kgforge Domain Layer
//!
//! Core value types shared by every stage of the graph-construction pipeline.
//! Infrastructure (file persistence, HTTP, graph storage) lives in other crates;
//! this crate only names things and states their invariants.
//!
//! ## Key Concepts
//!
//! - **Chunk**: a bounded unit of document text with a unique identifier
//! - **Document**: one corpus record, either a titled record or a legacy raw value
//! - **Node / Edge**: the property-graph vocabulary (attribute, entity, community)
//! - **Schema**: the allowed node, relation and attribute vocabulary of a dataset
//! - **Extraction**: one chunk's validated extraction-service result
//!
//! ## Architecture
//!
//! - Pure data and small invariant-preserving helpers
//! - Trait definitions for the external extraction service

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod build;
pub mod chunk;
pub mod document;
pub mod extraction;
pub mod node;
pub mod schema;
pub mod traits;

// Re-exports for convenience
pub use build::BuildId;
pub use chunk::{Chunk, ChunkId};
pub use document::Document;
pub use extraction::{AttributeValue, Extraction, Triple};
pub use node::{Edge, Node, NodeId, NodeLabel, NodeProperties};
pub use schema::{Schema, SchemaProposal};
pub use traits::{CommunityDetector, LlmProvider};
