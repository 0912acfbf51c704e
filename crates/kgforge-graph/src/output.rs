//! Relationship-record export
//!
//! The exported form is a JSON list with one record per edge:
//!
//! ```json
//! [
//!   {
//!     "start_node": {"label": "entity", "properties": {"name": "P-1", "chunk id": "a1B2c3D4"}},
//!     "relation": "supplies",
//!     "end_node": {"label": "entity", "properties": {"name": "AHU-1", "chunk id": "a1B2c3D4"}}
//!   }
//! ]
//! ```
//!
//! Isolated nodes do not appear. Non-ASCII text is written as-is.

use crate::error::GraphError;
use crate::graph::KnowledgeGraph;
use kgforge_domain::{Node, NodeLabel, NodeProperties};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

/// One endpoint of an exported relationship
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    /// Node kind
    pub label: NodeLabel,
    /// Node properties
    pub properties: NodeProperties,
}

impl From<&Node> for NodeRecord {
    fn from(node: &Node) -> Self {
        Self {
            label: node.label,
            properties: node.properties.clone(),
        }
    }
}

/// One exported edge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipRecord {
    /// Edge source
    pub start_node: NodeRecord,
    /// Edge relation
    pub relation: String,
    /// Edge target
    pub end_node: NodeRecord,
}

/// Relationship records for every edge, in insertion order
pub fn format_output(graph: &KnowledgeGraph) -> Vec<RelationshipRecord> {
    graph
        .edge_triples()
        .map(|(source, target, relation)| RelationshipRecord {
            start_node: source.into(),
            relation: relation.to_string(),
            end_node: target.into(),
        })
        .collect()
}

/// Write records as pretty-printed JSON, creating parent directories
pub fn write_output(path: &Path, records: &[RelationshipRecord]) -> Result<(), GraphError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| GraphError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let json = serde_json::to_string_pretty(records)?;
    fs::write(path, json).map_err(|source| GraphError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    info!(path = %path.display(), relationships = records.len(), "graph exported");
    Ok(())
}
