//! Knowledge graph storage
//!
//! A directed multigraph on petgraph with two side indexes: node id to graph index,
//! and entity name to node id. The entity index is what makes find-or-create
//! atomic; both are only touched through `&mut self`, so holding the
//! [`SharedGraph`] lock is enough to keep them consistent.

use crate::error::GraphError;
use kgforge_domain::{ChunkId, Edge, Node, NodeId, NodeLabel, NodeProperties};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Relation linking an entity to one of its attribute nodes
pub const HAS_ATTRIBUTE: &str = "has_attribute";

/// The property graph built by one run
#[derive(Debug, Clone, Default)]
pub struct KnowledgeGraph {
    graph: DiGraph<Node, String>,
    index: HashMap<NodeId, NodeIndex>,
    entities: HashMap<String, NodeId>,
    node_counter: u64,
}

/// Node and edge counts by kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GraphStats {
    /// Total nodes
    pub nodes: usize,
    /// Total edges
    pub edges: usize,
    /// Level-1 nodes
    pub attributes: usize,
    /// Level-2 nodes
    pub entities: usize,
    /// Level-4 nodes
    pub communities: usize,
}

impl KnowledgeGraph {
    /// Empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// The entity node named `name`, creating it if absent
    ///
    /// Properties are set on creation only; a later call with a different chunk
    /// or schema type returns the existing node unchanged.
    pub fn find_or_create_entity(
        &mut self,
        name: &str,
        chunk_id: &ChunkId,
        schema_type: Option<&str>,
    ) -> NodeId {
        if let Some(id) = self.entities.get(name) {
            return id.clone();
        }

        let properties =
            NodeProperties::extracted(name, chunk_id.clone()).with_schema_type(schema_type);
        let id = self.insert_node(NodeLabel::Entity, properties);
        self.entities.insert(name.to_string(), id.clone());
        id
    }

    /// Entity node named `name`, if present
    pub fn find_entity(&self, name: &str) -> Option<&NodeId> {
        self.entities.get(name)
    }

    /// New attribute node; attribute nodes are never shared
    pub fn add_attribute(&mut self, text: &str, chunk_id: &ChunkId) -> NodeId {
        self.insert_node(
            NodeLabel::Attribute,
            NodeProperties::extracted(text, chunk_id.clone()),
        )
    }

    /// New community super-node
    pub fn add_community(&mut self, name: impl Into<String>) -> NodeId {
        let properties = NodeProperties {
            name: name.into(),
            chunk_id: None,
            schema_type: None,
        };
        self.insert_node(NodeLabel::Community, properties)
    }

    fn insert_node(&mut self, label: NodeLabel, properties: NodeProperties) -> NodeId {
        let id = NodeId::from_counter(label, self.node_counter);
        self.node_counter += 1;
        let index = self.graph.add_node(Node {
            id: id.clone(),
            label,
            properties,
        });
        self.index.insert(id.clone(), index);
        id
    }

    /// Add a directed edge; parallel edges are allowed
    pub fn add_edge(
        &mut self,
        source: &NodeId,
        target: &NodeId,
        relation: impl Into<String>,
    ) -> Result<(), GraphError> {
        let from = self.index_of(source)?;
        let to = self.index_of(target)?;
        self.graph.add_edge(from, to, relation.into());
        Ok(())
    }

    fn index_of(&self, id: &NodeId) -> Result<NodeIndex, GraphError> {
        self.index
            .get(id)
            .copied()
            .ok_or_else(|| GraphError::UnknownNode(id.to_string()))
    }

    /// Look up a node
    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.index.get(id).map(|&index| &self.graph[index])
    }

    /// Nodes in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.graph.node_weights()
    }

    /// Edges in insertion order, as `(source, target, relation)`
    pub fn edge_triples(&self) -> impl Iterator<Item = (&Node, &Node, &str)> {
        self.graph.edge_references().map(|edge| {
            (
                &self.graph[edge.source()],
                &self.graph[edge.target()],
                edge.weight().as_str(),
            )
        })
    }

    /// Owned copies of all edges, in insertion order
    pub fn edges(&self) -> Vec<Edge> {
        self.edge_triples()
            .map(|(source, target, relation)| {
                Edge::new(source.id.clone(), target.id.clone(), relation)
            })
            .collect()
    }

    /// Copy of the graph keeping only the edges `keep` accepts
    ///
    /// Nodes, identifiers and the entity index are carried over unchanged; edges
    /// are visited in insertion order.
    pub(crate) fn filter_edges(
        &self,
        mut keep: impl FnMut(&Node, &Node, &str) -> bool,
    ) -> KnowledgeGraph {
        let graph = self.graph.filter_map(
            |_, node| Some(node.clone()),
            |edge, relation| {
                let (source, target) = self.graph.edge_endpoints(edge)?;
                keep(&self.graph[source], &self.graph[target], relation)
                    .then(|| relation.clone())
            },
        );
        KnowledgeGraph {
            graph,
            index: self.index.clone(),
            entities: self.entities.clone(),
            node_counter: self.node_counter,
        }
    }

    /// Identifiers of all nodes with `label`
    pub fn ids_with_label(&self, label: NodeLabel) -> Vec<NodeId> {
        self.nodes()
            .filter(|n| n.label == label)
            .map(|n| n.id.clone())
            .collect()
    }

    /// Number of entity nodes named `name`; at most one in a consistent graph
    pub fn entity_count_named(&self, name: &str) -> usize {
        self.nodes()
            .filter(|n| n.label == NodeLabel::Entity && n.name() == name)
            .count()
    }

    /// Number of nodes
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of edges
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Whether the graph holds no nodes
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Node and edge counts
    pub fn stats(&self) -> GraphStats {
        let mut stats = GraphStats {
            nodes: self.node_count(),
            edges: self.edge_count(),
            ..Default::default()
        };
        for node in self.nodes() {
            match node.label {
                NodeLabel::Attribute => stats.attributes += 1,
                NodeLabel::Entity => stats.entities += 1,
                NodeLabel::Community => stats.communities += 1,
            }
        }
        stats
    }
}

/// A knowledge graph shared between build workers
///
/// Every mutation happens under one mutex. A worker that panics while holding it
/// poisons the graph, and later callers get [`GraphError::Poisoned`] instead of
/// a possibly half-written graph.
#[derive(Debug, Clone, Default)]
pub struct SharedGraph(Arc<Mutex<KnowledgeGraph>>);

impl SharedGraph {
    /// Empty shared graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Share an existing graph
    pub fn from_graph(graph: KnowledgeGraph) -> Self {
        Self(Arc::new(Mutex::new(graph)))
    }

    /// Acquire the graph lock
    pub fn lock(&self) -> Result<MutexGuard<'_, KnowledgeGraph>, GraphError> {
        self.0.lock().map_err(|_| GraphError::Poisoned)
    }

    /// Run `f` with exclusive access to the graph
    pub fn with<R>(&self, f: impl FnOnce(&mut KnowledgeGraph) -> R) -> Result<R, GraphError> {
        let mut guard = self.lock()?;
        Ok(f(&mut guard))
    }

    /// Copy of the current graph
    pub fn snapshot(&self) -> Result<KnowledgeGraph, GraphError> {
        Ok(self.lock()?.clone())
    }

    /// Swap in a new graph, returning the old one
    pub fn replace(&self, graph: KnowledgeGraph) -> Result<KnowledgeGraph, GraphError> {
        Ok(std::mem::replace(&mut *self.lock()?, graph))
    }
}
