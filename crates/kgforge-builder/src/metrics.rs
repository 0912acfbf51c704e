//! Metrics collected during a build

use kgforge_domain::BuildId;
use kgforge_graph::GraphStats;
use std::time::Duration;

/// Approximate token count of a text (about four characters per token)
pub fn estimate_tokens(text: &str) -> u64 {
    (text.chars().count() as u64).div_ceil(4)
}

/// Counters and timings reported at the end of a build
#[derive(Debug, Clone, Default)]
pub struct BuildMetrics {
    /// Build identifier
    pub build_id: BuildId,

    /// Dataset built
    pub dataset: String,

    /// Documents in the corpus
    pub documents: usize,

    /// Chunks registered during chunking
    pub chunks: usize,

    /// Chunks dropped for lack of an identifier
    pub dropped_chunks: usize,

    /// Documents completed without error
    pub processed: usize,

    /// Documents that raised (timeouts included)
    pub failed: usize,

    /// Documents abandoned at their deadline
    pub timed_out: usize,

    /// Whether the batch deadline cut the build short
    pub deadline_hit: bool,

    /// Chunk responses parsed as JSON objects
    pub parsed_chunks: usize,

    /// Chunk responses degraded to an empty result
    pub degraded_chunks: usize,

    /// Chunks with no usable response
    pub empty_chunks: usize,

    /// Schema versions written during the build
    pub schema_updates: usize,

    /// Approximate tokens sent and received
    pub token_cost: u64,

    /// Time spent in the extraction phase
    pub construction_time: Duration,

    /// Graph before deduplication
    pub before_dedup: GraphStats,

    /// Graph right after deduplication
    pub after_dedup: GraphStats,

    /// Exported graph, community nodes included
    pub exported: GraphStats,

    /// Community nodes created
    pub communities: usize,
}

impl BuildMetrics {
    /// Empty metrics for a dataset
    pub fn new(dataset: impl Into<String>) -> Self {
        Self {
            dataset: dataset.into(),
            ..Self::default()
        }
    }

    /// Documents neither processed nor failed (cut off by the batch deadline)
    pub fn unfinished(&self) -> usize {
        self.documents.saturating_sub(self.processed + self.failed)
    }

    /// Edges removed by deduplication
    pub fn duplicate_edges(&self) -> usize {
        self.before_dedup.edges.saturating_sub(self.after_dedup.edges)
    }

    /// Get a formatted summary of metrics
    pub fn summary(&self) -> String {
        let mut lines = vec![
            format!("Build Summary ({})", self.dataset),
            "==============".to_string(),
            format!("Build: {}", self.build_id),
            format!("Documents: {}", self.documents),
            format!("  Processed: {}", self.processed),
            format!("  Failed: {} ({} timed out)", self.failed, self.timed_out),
        ];
        if self.deadline_hit {
            lines.push(format!("  Unfinished at batch deadline: {}", self.unfinished()));
        }

        lines.push(format!(
            "Chunks: {} ({} dropped)",
            self.chunks, self.dropped_chunks
        ));
        lines.push(format!(
            "  Responses: {} parsed, {} degraded, {} empty",
            self.parsed_chunks, self.degraded_chunks, self.empty_chunks
        ));
        if self.schema_updates > 0 {
            lines.push(format!("  Schema updates: {}", self.schema_updates));
        }

        lines.push(format!(
            "Construction time: {:.1}s",
            self.construction_time.as_secs_f64()
        ));
        lines.push(format!("Token cost: ~{}", self.token_cost));
        lines.push(String::new());
        lines.push(format!(
            "Graph before dedup: {} nodes, {} edges",
            self.before_dedup.nodes, self.before_dedup.edges
        ));
        lines.push(format!(
            "Graph after dedup: {} nodes, {} edges ({} duplicates removed)",
            self.after_dedup.nodes,
            self.after_dedup.edges,
            self.duplicate_edges()
        ));
        lines.push(format!(
            "Exported: {} attributes, {} entities, {} communities, {} relationships",
            self.exported.attributes,
            self.exported.entities,
            self.communities,
            self.exported.edges
        ));

        lines.join("\n")
    }
}
