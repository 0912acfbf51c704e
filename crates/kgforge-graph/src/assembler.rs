//! Turning extraction results into graph writes
//!
//! Every result is first staged into a flat list of writes without touching the
//! graph. Buffered mode then applies the whole list under one lock, so another
//! worker never sees half a chunk. Direct mode takes the lock once per staged
//! item, which lets a caller interleave other work (schema evolution, progress
//! reporting) between writes. In both modes each find-or-create and its edge
//! happen under the same guard, which is what keeps entity names unique.

use crate::error::GraphError;
use crate::graph::{KnowledgeGraph, SharedGraph, HAS_ATTRIBUTE};
use kgforge_domain::{AttributeValue, ChunkId, Extraction, NodeId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Locking granularity for graph writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssemblyMode {
    /// Stage a chunk's writes, commit them under one lock
    #[default]
    Buffered,
    /// Take the lock for each attribute or triple
    Direct,
}

/// What one assembly call added
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssemblyStats {
    /// Nodes created (attribute nodes plus new entities)
    pub nodes_added: usize,
    /// Edges created
    pub edges_added: usize,
}

impl AssemblyStats {
    fn merge(&mut self, other: AssemblyStats) {
        self.nodes_added += other.nodes_added;
        self.edges_added += other.edges_added;
    }
}

/// One pending graph write
#[derive(Debug)]
enum Staged<'a> {
    Attribute {
        entity: &'a str,
        entity_type: Option<&'a str>,
        text: &'a str,
    },
    Relation {
        subject: &'a str,
        subject_type: Option<&'a str>,
        relation: &'a str,
        object: &'a str,
        object_type: Option<&'a str>,
    },
}

impl Staged<'_> {
    fn apply(&self, graph: &mut KnowledgeGraph, chunk_id: &ChunkId) -> Result<AssemblyStats, GraphError> {
        let before = graph.node_count();
        match self {
            Staged::Attribute {
                entity,
                entity_type,
                text,
            } => {
                let attribute = graph.add_attribute(text, chunk_id);
                let entity = graph.find_or_create_entity(entity, chunk_id, *entity_type);
                graph.add_edge(&entity, &attribute, HAS_ATTRIBUTE)?;
            }
            Staged::Relation {
                subject,
                subject_type,
                relation,
                object,
                object_type,
            } => {
                let subject = graph.find_or_create_entity(subject, chunk_id, *subject_type);
                let object = graph.find_or_create_entity(object, chunk_id, *object_type);
                graph.add_edge(&subject, &object, *relation)?;
            }
        }
        Ok(AssemblyStats {
            nodes_added: graph.node_count() - before,
            edges_added: 1,
        })
    }
}

fn stage_attributes<'a>(
    attributes: &'a [(String, AttributeValue)],
    entity_types: &'a HashMap<String, String>,
) -> Vec<Staged<'a>> {
    attributes
        .iter()
        .flat_map(|(entity, values)| {
            let entity_type = entity_types.get(entity).map(String::as_str);
            values.iter().map(move |text| Staged::Attribute {
                entity: entity.as_str(),
                entity_type,
                text,
            })
        })
        .collect()
}

fn stage_triples<'a>(
    triples: &'a [Vec<String>],
    entity_types: &'a HashMap<String, String>,
) -> Vec<Staged<'a>> {
    triples
        .iter()
        .filter_map(|parts| match parts.as_slice() {
            [subject, relation, object, ..] => Some(Staged::Relation {
                subject: subject.as_str(),
                subject_type: entity_types.get(subject).map(String::as_str),
                relation: relation.as_str(),
                object: object.as_str(),
                object_type: entity_types.get(object).map(String::as_str),
            }),
            _ => None,
        })
        .collect()
}

/// Writes extraction results into a shared graph
///
/// Cheap to clone; clones write into the same graph.
///
/// # Examples
///
/// ```
/// use kgforge_domain::{AttributeValue, ChunkId, Extraction};
/// use kgforge_graph::{AssemblyMode, GraphAssembler, SharedGraph};
///
/// let graph = SharedGraph::new();
/// let assembler = GraphAssembler::new(graph.clone(), AssemblyMode::Direct);
/// let extraction = Extraction {
///     attributes: vec![("AHU-1".into(), AttributeValue::List(vec!["floor: 3F".into()]))],
///     ..Default::default()
/// };
///
/// let stats = assembler.assemble(&extraction, &ChunkId::new("c1")).unwrap();
/// assert_eq!(stats.nodes_added, 2);
/// assert_eq!(stats.edges_added, 1);
/// ```
#[derive(Debug, Clone)]
pub struct GraphAssembler {
    graph: SharedGraph,
    mode: AssemblyMode,
}

impl GraphAssembler {
    /// Assembler writing into `graph`
    pub fn new(graph: SharedGraph, mode: AssemblyMode) -> Self {
        Self { graph, mode }
    }

    /// The graph being written
    pub fn graph(&self) -> &SharedGraph {
        &self.graph
    }

    /// Locking granularity
    pub fn mode(&self) -> AssemblyMode {
        self.mode
    }

    /// Find or create one entity under the graph lock
    pub fn find_or_create_entity(
        &self,
        name: &str,
        chunk_id: &ChunkId,
        schema_type: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        self.graph
            .with(|graph| graph.find_or_create_entity(name, chunk_id, schema_type))
    }

    /// Add one attribute node and `has_attribute` edge per attribute value
    ///
    /// An entity with an empty value list gets no node at all.
    pub fn add_attribute_edges(
        &self,
        attributes: &[(String, AttributeValue)],
        chunk_id: &ChunkId,
        entity_types: &HashMap<String, String>,
    ) -> Result<AssemblyStats, GraphError> {
        self.commit(stage_attributes(attributes, entity_types), chunk_id)
    }

    /// Add one edge per triple, creating missing endpoints
    ///
    /// Triples with fewer than three elements are skipped; extra elements are ignored.
    pub fn add_triple_edges(
        &self,
        triples: &[Vec<String>],
        chunk_id: &ChunkId,
        entity_types: &HashMap<String, String>,
    ) -> Result<AssemblyStats, GraphError> {
        self.commit(stage_triples(triples, entity_types), chunk_id)
    }

    /// Write a whole extraction: attributes first, then triples
    pub fn assemble(
        &self,
        extraction: &Extraction,
        chunk_id: &ChunkId,
    ) -> Result<AssemblyStats, GraphError> {
        let mut staged = stage_attributes(&extraction.attributes, &extraction.entity_types);
        staged.extend(stage_triples(&extraction.triples, &extraction.entity_types));
        let stats = self.commit(staged, chunk_id)?;
        debug!(
            chunk = %chunk_id,
            nodes = stats.nodes_added,
            edges = stats.edges_added,
            "assembled chunk"
        );
        Ok(stats)
    }

    fn commit(&self, staged: Vec<Staged<'_>>, chunk_id: &ChunkId) -> Result<AssemblyStats, GraphError> {
        let mut stats = AssemblyStats::default();
        if staged.is_empty() {
            return Ok(stats);
        }

        match self.mode {
            AssemblyMode::Buffered => {
                let mut graph = self.graph.lock()?;
                for item in &staged {
                    stats.merge(item.apply(&mut graph, chunk_id)?);
                }
            }
            AssemblyMode::Direct => {
                for item in &staged {
                    let mut graph = self.graph.lock()?;
                    stats.merge(item.apply(&mut graph, chunk_id)?);
                }
            }
        }
        Ok(stats)
    }
}
