//! Community super-nodes
//!
//! Detection is a collaborator behind [`CommunityDetector`]; this module only
//! applies its answer. Each community becomes one level-4 node, and every member
//! entity gets a `member_of` edge to it. Nothing else in the graph changes.

use crate::error::GraphError;
use crate::graph::KnowledgeGraph;
use kgforge_domain::{CommunityDetector, Edge, Node, NodeId};
use petgraph::unionfind::UnionFind;
use std::collections::{BTreeMap, HashMap};
use tracing::{info, warn};

/// Relation from a member entity to its community node
pub const MEMBER_OF: &str = "member_of";

const NAME_MEMBERS: usize = 3;

/// Insert community nodes and membership edges; returns the number of communities added
///
/// Members missing from the graph are skipped with a warning, and a community
/// left without members gets no node.
pub fn apply_communities(
    graph: &mut KnowledgeGraph,
    communities: &BTreeMap<u64, Vec<NodeId>>,
) -> Result<usize, GraphError> {
    let mut added = 0;
    for (community, members) in communities {
        let known: Vec<&NodeId> = members
            .iter()
            .filter(|id| {
                let present = graph.node(id).is_some();
                if !present {
                    warn!(community, member = %id, "community member not in graph");
                }
                present
            })
            .collect();
        if known.is_empty() {
            continue;
        }

        let name = known
            .iter()
            .take(NAME_MEMBERS)
            .filter_map(|id| graph.node(id).map(|n| n.name().to_string()))
            .collect::<Vec<_>>()
            .join(", ");
        let node = graph.add_community(name);
        for member in known {
            graph.add_edge(member, &node, MEMBER_OF)?;
        }
        added += 1;
    }

    info!(communities = added, "community nodes created");
    Ok(added)
}

impl KnowledgeGraph {
    /// Run `detector` over the entity nodes and apply its communities
    pub fn detect_communities<D: CommunityDetector>(
        &mut self,
        detector: &D,
        struct_weight: f32,
    ) -> Result<usize, GraphError> {
        let nodes: Vec<Node> = self.nodes().cloned().collect();
        let edges = self.edges();
        let entity_ids = self.ids_with_label(kgforge_domain::NodeLabel::Entity);

        let communities = detector
            .detect(&nodes, &edges, &entity_ids, struct_weight)
            .map_err(|e| GraphError::Community(e.to_string()))?;
        apply_communities(self, &communities)
    }
}

/// Structure-only detector: entities connected by entity-to-entity edges
///
/// Communities are the weakly connected components of the entity subgraph,
/// ignoring edge direction. Components smaller than `min_size` are dropped.
/// There is no embedding model, so `struct_weight` has no effect.
#[derive(Debug, Clone, Copy)]
pub struct ComponentDetector {
    min_size: usize,
}

impl ComponentDetector {
    /// Detector keeping components of at least `min_size` entities
    pub fn new(min_size: usize) -> Self {
        Self {
            min_size: min_size.max(1),
        }
    }
}

impl Default for ComponentDetector {
    fn default() -> Self {
        Self::new(2)
    }
}

impl CommunityDetector for ComponentDetector {
    type Error = GraphError;

    fn detect(
        &self,
        _nodes: &[Node],
        edges: &[Edge],
        entity_ids: &[NodeId],
        _struct_weight: f32,
    ) -> Result<BTreeMap<u64, Vec<NodeId>>, GraphError> {
        let position: HashMap<&NodeId, usize> = entity_ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id, i))
            .collect();

        let mut sets = UnionFind::<usize>::new(entity_ids.len());
        for edge in edges {
            if let (Some(&a), Some(&b)) = (position.get(&edge.source), position.get(&edge.target)) {
                sets.union(a, b);
            }
        }

        let mut components: BTreeMap<usize, Vec<NodeId>> = BTreeMap::new();
        for (i, id) in entity_ids.iter().enumerate() {
            components.entry(sets.find(i)).or_default().push(id.clone());
        }

        // Renumber by first member so ids follow entity order
        let mut ordered: Vec<Vec<NodeId>> = components
            .into_values()
            .filter(|members| members.len() >= self.min_size)
            .collect();
        ordered.sort_by_key(|members| position.get(&members[0]).copied());

        Ok(ordered
            .into_iter()
            .enumerate()
            .map(|(i, members)| (i as u64, members))
            .collect())
    }
}
