//! Graph vocabulary: nodes, labels and edges

use crate::chunk::ChunkId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Engine-assigned node identifier, stable for the lifetime of a build
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Compose an identifier from a label prefix and a counter value
    pub fn from_counter(label: NodeLabel, counter: u64) -> Self {
        Self(format!("{}_{}", label.id_prefix(), counter))
    }

    /// Wrap an existing identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier text
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Node kind; each kind lives on a fixed hierarchy level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeLabel {
    /// A literal fact attached to an entity (level 1)
    Attribute,

    /// A canonical real-world referent (level 2)
    Entity,

    /// A super-node grouping entities (level 4)
    Community,
}

impl NodeLabel {
    /// Hierarchy level; level 3 is reserved
    pub fn level(&self) -> u8 {
        match self {
            NodeLabel::Attribute => 1,
            NodeLabel::Entity => 2,
            NodeLabel::Community => 4,
        }
    }

    /// Label text used in exports
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeLabel::Attribute => "attribute",
            NodeLabel::Entity => "entity",
            NodeLabel::Community => "community",
        }
    }

    fn id_prefix(&self) -> &'static str {
        match self {
            NodeLabel::Attribute => "attr",
            NodeLabel::Entity => "entity",
            NodeLabel::Community => "comm",
        }
    }
}

impl fmt::Display for NodeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Properties carried by every node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeProperties {
    /// Entity name, attribute text or community name
    pub name: String,

    /// Chunk the node was first extracted from
    #[serde(rename = "chunk id", default, skip_serializing_if = "Option::is_none")]
    pub chunk_id: Option<ChunkId>,

    /// Schema type inferred at extraction (entities only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<String>,
}

impl NodeProperties {
    /// Properties for a node extracted from a chunk
    pub fn extracted(name: impl Into<String>, chunk_id: ChunkId) -> Self {
        Self {
            name: name.into(),
            chunk_id: Some(chunk_id),
            schema_type: None,
        }
    }

    /// Attach a schema type
    pub fn with_schema_type(mut self, schema_type: Option<&str>) -> Self {
        self.schema_type = schema_type.map(str::to_string);
        self
    }
}

/// A graph node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    /// Node identifier
    pub id: NodeId,

    /// Node kind
    pub label: NodeLabel,

    /// Node properties
    pub properties: NodeProperties,
}

impl Node {
    /// Hierarchy level of the node
    pub fn level(&self) -> u8 {
        self.label.level()
    }

    /// Node name
    pub fn name(&self) -> &str {
        &self.properties.name
    }
}

/// A directed, labelled edge
///
/// Parallel edges between the same pair with different relations are expected.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Edge {
    /// Source node
    pub source: NodeId,

    /// Target node
    pub target: NodeId,

    /// Relation label
    pub relation: String,
}

impl Edge {
    /// Create an edge
    pub fn new(source: NodeId, target: NodeId, relation: impl Into<String>) -> Self {
        Self {
            source,
            target,
            relation: relation.into(),
        }
    }
}
