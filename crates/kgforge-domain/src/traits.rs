//! Trait definitions for external interactions
//!
//! These traits define the boundaries between the pipeline and its collaborators.
//! Implementations live in other crates.

use crate::node::{Edge, Node, NodeId};
use std::collections::BTreeMap;

/// Trait for the extraction service (prompt in, completion out)
///
/// Implemented by the infrastructure layer (kgforge-llm). The call is blocking and
/// runs inline on a build worker. No retries are expected from callers.
pub trait LlmProvider: Send + Sync {
    /// Error type for service calls
    type Error: std::fmt::Display;

    /// Generate a completion
    ///
    /// `Ok(None)` means the service answered without content.
    fn generate(&self, prompt: &str) -> Result<Option<String>, Self::Error>;

    /// Model name, for logs and reports
    fn model_name(&self) -> &str {
        "llm"
    }
}

impl<T: LlmProvider + ?Sized> LlmProvider for std::sync::Arc<T> {
    type Error = T::Error;

    fn generate(&self, prompt: &str) -> Result<Option<String>, Self::Error> {
        (**self).generate(prompt)
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }
}

/// Trait for the community-detection collaborator
///
/// The detector sees a read-only view of the graph and the entity nodes to cluster,
/// and returns community id to member ids. It never mutates the graph itself; the
/// caller inserts the level-4 nodes and membership edges.
pub trait CommunityDetector: Send + Sync {
    /// Error type for detection failures
    type Error: std::fmt::Display;

    /// Cluster `entity_ids`
    ///
    /// `struct_weight` weighs graph structure against embedding similarity
    /// (0.0 = embeddings only, 1.0 = structure only).
    fn detect(
        &self,
        nodes: &[Node],
        edges: &[Edge],
        entity_ids: &[NodeId],
        struct_weight: f32,
    ) -> Result<BTreeMap<u64, Vec<NodeId>>, Self::Error>;
}
