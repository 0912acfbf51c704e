//! kgforge Graph
//!
//! The in-memory knowledge graph a build writes into, and the stages that run on
//! it once extraction is done.
//!
//! # Architecture
//!
//! ```text
//! Extraction → GraphAssembler → SharedGraph (Mutex<KnowledgeGraph>)
//!                                    │
//!                       deduplicate → communities → format_output → JSON
//! ```
//!
//! # Key Features
//!
//! - **Entity uniqueness**: an entity name maps to one node, even under concurrent workers
//! - **Two assembly modes**: one lock per chunk (buffered) or one lock per item (direct)
//! - **Parallel edges**: the same pair may be linked by several relations
//! - **Deduplication**: identical `(source, target, relation)` edges collapse to the first seen
//! - **Community super-nodes**: level-4 nodes linked to their member entities
//!
//! # Example Usage
//!
//! ```
//! use kgforge_domain::{ChunkId, Extraction};
//! use kgforge_graph::{format_output, AssemblyMode, GraphAssembler, SharedGraph};
//!
//! let graph = SharedGraph::new();
//! let assembler = GraphAssembler::new(graph.clone(), AssemblyMode::Buffered);
//!
//! let extraction = Extraction {
//!     triples: vec![vec!["P-1".into(), "supplies".into(), "AHU-1".into()]],
//!     ..Default::default()
//! };
//! assembler.assemble(&extraction, &ChunkId::new("c1")).unwrap();
//!
//! let records = format_output(&graph.snapshot().unwrap());
//! assert_eq!(records[0].relation, "supplies");
//! ```

#![warn(missing_docs)]

mod assembler;
mod community;
mod dedup;
mod error;
mod graph;
mod output;

pub use assembler::{AssemblyMode, AssemblyStats, GraphAssembler};
pub use community::{apply_communities, ComponentDetector, MEMBER_OF};
pub use error::GraphError;
pub use graph::{GraphStats, KnowledgeGraph, SharedGraph, HAS_ATTRIBUTE};
pub use output::{format_output, write_output, NodeRecord, RelationshipRecord};
