//! Edge deduplication

use crate::graph::KnowledgeGraph;
use std::collections::HashSet;
use tracing::info;

impl KnowledgeGraph {
    /// Copy of the graph with repeated `(source, target, relation)` edges removed
    ///
    /// The first occurrence of each edge is kept and relative order is preserved.
    /// Nodes are untouched, and edges that differ only in relation all survive.
    /// Running it twice gives the same graph as running it once.
    ///
    /// # Examples
    ///
    /// ```
    /// use kgforge_domain::ChunkId;
    /// use kgforge_graph::KnowledgeGraph;
    ///
    /// let mut graph = KnowledgeGraph::new();
    /// let chunk = ChunkId::new("c1");
    /// let a = graph.find_or_create_entity("a", &chunk, None);
    /// let b = graph.find_or_create_entity("b", &chunk, None);
    /// graph.add_edge(&a, &b, "serves").unwrap();
    /// graph.add_edge(&a, &b, "serves").unwrap();
    /// graph.add_edge(&a, &b, "controls").unwrap();
    ///
    /// let deduped = graph.deduplicate();
    /// assert_eq!(deduped.edge_count(), 2);
    /// assert_eq!(deduped.node_count(), 2);
    /// ```
    pub fn deduplicate(&self) -> KnowledgeGraph {
        let mut seen = HashSet::new();
        let deduped = self.filter_edges(|source, target, relation| {
            seen.insert((source.id.clone(), target.id.clone(), relation.to_string()))
        });

        let removed = self.edge_count() - deduped.edge_count();
        if removed > 0 {
            info!(removed, remaining = deduped.edge_count(), "removed duplicate edges");
        }
        deduped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kgforge_domain::ChunkId;
    use proptest::prelude::*;

    #[test]
    fn test_first_occurrence_order_is_kept() {
        let mut graph = KnowledgeGraph::new();
        let chunk = ChunkId::new("c1");
        let a = graph.find_or_create_entity("a", &chunk, None);
        let b = graph.find_or_create_entity("b", &chunk, None);
        graph.add_edge(&b, &a, "part_of").unwrap();
        graph.add_edge(&a, &b, "contains").unwrap();
        graph.add_edge(&b, &a, "part_of").unwrap();
        graph.add_edge(&a, &b, "serves").unwrap();

        let relations: Vec<String> = graph
            .deduplicate()
            .edges()
            .into_iter()
            .map(|e| e.relation)
            .collect();
        assert_eq!(relations, vec!["part_of", "contains", "serves"]);
    }

    #[test]
    fn test_deduplicated_graph_keeps_entity_index() {
        let mut graph = KnowledgeGraph::new();
        let chunk = ChunkId::new("c1");
        let a = graph.find_or_create_entity("a", &chunk, None);
        let mut deduped = graph.deduplicate();

        assert_eq!(deduped.find_or_create_entity("a", &chunk, None), a);
        assert_eq!(
            deduped.find_or_create_entity("b", &chunk, None).as_str(),
            "entity_1"
        );
    }

    proptest! {
        /// Property: deduplication is idempotent and never drops a distinct edge
        #[test]
        fn test_dedup_idempotent(edges in prop::collection::vec((0usize..4, 0usize..4, 0usize..3), 0..40)) {
            let mut graph = KnowledgeGraph::new();
            let chunk = ChunkId::new("c");
            let ids: Vec<_> = (0..4)
                .map(|i| graph.find_or_create_entity(&format!("e{}", i), &chunk, None))
                .collect();
            for (s, t, r) in &edges {
                graph.add_edge(&ids[*s], &ids[*t], format!("r{}", r)).unwrap();
            }

            let once = graph.deduplicate();
            let twice = once.deduplicate();
            prop_assert_eq!(once.edges(), twice.edges());

            let distinct: HashSet<_> = edges.iter().collect();
            prop_assert_eq!(once.edge_count(), distinct.len());
            prop_assert_eq!(once.node_count(), graph.node_count());
        }
    }
}
