//! Per-document and per-chunk processing
//!
//! A [`BuildSession`] owns everything a worker needs for one dataset: the frozen
//! chunk store, the prompt builder and validator, the graph assembler and the
//! current schema. Workers share it through an `Arc` and call
//! [`BuildSession::process_document`] from blocking threads.

use crate::error::BuildError;
use crate::metrics::estimate_tokens;
use crate::schema_evolution::SchemaEvolutionManager;
use kgforge_domain::{Chunk, Document, LlmProvider, Schema};
use kgforge_extractor::{ParseOutcome, PromptBuilder, ResponseValidator};
use kgforge_graph::{AssemblyStats, GraphAssembler};
use kgforge_store::ChunkStore;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info, warn};

/// What one document contributed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DocumentStats {
    /// Chunks processed
    pub chunks: usize,
    /// Chunks whose processing failed (graph errors)
    pub failed_chunks: usize,
    /// Nodes created
    pub nodes_added: usize,
    /// Edges created
    pub edges_added: usize,
}

/// Running totals across every worker of a session
#[derive(Debug, Default)]
struct Counters {
    tokens: AtomicU64,
    parsed: AtomicUsize,
    degraded: AtomicUsize,
    empty: AtomicUsize,
    schema_updates: AtomicUsize,
}

/// Snapshot of a session's running totals
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionTotals {
    /// Approximate tokens sent and received
    pub tokens: u64,
    /// Responses parsed as JSON objects
    pub parsed: usize,
    /// Responses degraded to an empty result
    pub degraded: usize,
    /// Chunks without a usable response
    pub empty: usize,
    /// Schema versions written
    pub schema_updates: usize,
}

/// Shared state for extracting one dataset
pub struct BuildSession<P> {
    dataset: String,
    provider: P,
    chunks: Arc<ChunkStore>,
    prompts: PromptBuilder,
    validator: ResponseValidator,
    assembler: GraphAssembler,
    schema: RwLock<Arc<Schema>>,
    evolution: Option<SchemaEvolutionManager>,
    counters: Counters,
}

impl<P: LlmProvider> BuildSession<P> {
    /// Session over a chunked corpus
    pub fn new(
        dataset: impl Into<String>,
        provider: P,
        chunks: Arc<ChunkStore>,
        prompts: PromptBuilder,
        validator: ResponseValidator,
        assembler: GraphAssembler,
        schema: Schema,
    ) -> Self {
        Self {
            dataset: dataset.into(),
            provider,
            chunks,
            prompts,
            validator,
            assembler,
            schema: RwLock::new(Arc::new(schema)),
            evolution: None,
            counters: Counters::default(),
        }
    }

    /// Apply `new_schema_types` proposals through `manager` (agent builds)
    pub fn with_schema_evolution(mut self, manager: SchemaEvolutionManager) -> Self {
        self.evolution = Some(manager);
        self
    }

    /// Dataset being built
    pub fn dataset(&self) -> &str {
        &self.dataset
    }

    /// Schema used for the next prompt
    pub fn schema(&self) -> Arc<Schema> {
        self.schema
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Running totals
    pub fn totals(&self) -> SessionTotals {
        SessionTotals {
            tokens: self.counters.tokens.load(Ordering::Relaxed),
            parsed: self.counters.parsed.load(Ordering::Relaxed),
            degraded: self.counters.degraded.load(Ordering::Relaxed),
            empty: self.counters.empty.load(Ordering::Relaxed),
            schema_updates: self.counters.schema_updates.load(Ordering::Relaxed),
        }
    }

    /// Process every chunk of a document, in order
    ///
    /// A failing chunk is logged and counted; the rest of the document still runs.
    /// `cancel` is checked between chunks, and a set flag abandons the document.
    pub fn process_document(
        &self,
        index: usize,
        document: &Document,
        cancel: &AtomicBool,
    ) -> Result<DocumentStats, BuildError> {
        if document.is_empty() {
            return Err(BuildError::Document {
                index,
                reason: "document is empty".to_string(),
            });
        }

        let chunks = self.chunks.chunks_for_document(index, document.title());
        if chunks.is_empty() {
            let title = match document.title() {
                "" => "Unknown".to_string(),
                title => title.to_string(),
            };
            return Err(BuildError::NoChunks { index, title });
        }

        info!(document = index, chunks = chunks.len(), "processing document");
        let mut stats = DocumentStats::default();
        for chunk in &chunks {
            if cancel.load(Ordering::Relaxed) {
                return Err(BuildError::Cancelled { index });
            }
            match self.process_chunk(chunk, cancel) {
                Ok(added) => {
                    stats.nodes_added += added.nodes_added;
                    stats.edges_added += added.edges_added;
                }
                Err(e) => {
                    warn!(document = index, chunk = %chunk.id, error = %e, "chunk failed");
                    stats.failed_chunks += 1;
                }
            }
            stats.chunks += 1;
        }
        Ok(stats)
    }

    /// Prompt, call, validate, evolve the schema (agent builds), assemble
    ///
    /// A failed or empty service call degrades to an empty result; only graph
    /// errors are returned. A result that arrives after `cancel` was set is
    /// discarded without touching the schema or the graph.
    pub fn process_chunk(
        &self,
        chunk: &Chunk,
        cancel: &AtomicBool,
    ) -> Result<AssemblyStats, BuildError> {
        let schema = self.schema();
        let prompt = self.prompts.build(&schema, &chunk.text);

        let response = match self.provider.generate(&prompt) {
            Ok(response) => response,
            Err(e) => {
                warn!(chunk = %chunk.id, model = self.provider.model_name(), error = %e, "extraction call failed");
                None
            }
        };
        let cost = estimate_tokens(&prompt) + response.as_deref().map_or(0, estimate_tokens);
        self.counters.tokens.fetch_add(cost, Ordering::Relaxed);

        let outcome = self.validator.validate(response.as_deref());
        let counter = match &outcome {
            ParseOutcome::Parsed(_) => &self.counters.parsed,
            ParseOutcome::Degraded => {
                warn!(chunk = %chunk.id, "unparsable response, using empty result");
                &self.counters.degraded
            }
            ParseOutcome::NoResult => {
                debug!(chunk = %chunk.id, "no result for chunk");
                &self.counters.empty
            }
        };
        counter.fetch_add(1, Ordering::Relaxed);

        let Some(extraction) = outcome.extraction() else {
            return Ok(AssemblyStats::default());
        };
        if cancel.load(Ordering::Relaxed) {
            debug!(chunk = %chunk.id, "document cancelled, result discarded");
            return Ok(AssemblyStats::default());
        }

        if let (Some(manager), Some(proposal)) = (&self.evolution, &extraction.new_schema_types) {
            match manager.evolve(&self.dataset, proposal) {
                Ok(Some(next)) => {
                    *self.schema.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(next);
                    self.counters.schema_updates.fetch_add(1, Ordering::Relaxed);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(dataset = %self.dataset, error = %e, "schema update skipped");
                }
            }
        }

        let added = self.assembler.assemble(&extraction, &chunk.id)?;
        debug!(
            chunk = %chunk.id,
            nodes = added.nodes_added,
            edges = added.edges_added,
            "chunk processed"
        );
        Ok(added)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kgforge_extractor::PromptStyle;
    use kgforge_graph::{AssemblyMode, SharedGraph};
    use kgforge_llm::MockProvider;
    use kgforge_store::SchemaFile;

    const EMPTY: &str = r#"{"attributes": {}, "triples": [], "entity_types": {}}"#;

    fn session(
        provider: MockProvider,
        documents: &[Document],
        graph: &SharedGraph,
    ) -> BuildSession<MockProvider> {
        let mut store = ChunkStore::with_seed(7);
        for (index, document) in documents.iter().enumerate() {
            let id = store.register(document.full_text()).unwrap();
            store.record_document(index, vec![id]);
        }
        BuildSession::new(
            "demo",
            provider,
            Arc::new(store),
            PromptBuilder::new(PromptStyle::General),
            ResponseValidator::new(),
            GraphAssembler::new(graph.clone(), AssemblyMode::Buffered),
            Schema::default(),
        )
    }

    #[test]
    fn test_document_flows_into_graph() {
        let mut provider = MockProvider::new(EMPTY);
        provider.add_response(
            "Pump P-1",
            r#"{"attributes": {"P-1": ["flow: 20m3/h"]}, "triples": [["P-1", "供应", "AHU-1"]], "entity_types": {"P-1": "asset"}}"#,
        );
        let docs = vec![Document::record("Pumps", "Pump P-1 feeds AHU-1.")];
        let graph = SharedGraph::new();
        let session = session(provider, &docs, &graph);

        let stats = session
            .process_document(0, &docs[0], &AtomicBool::new(false))
            .unwrap();
        assert_eq!(stats.chunks, 1);
        assert_eq!(stats.edges_added, 2);

        let snapshot = graph.snapshot().unwrap();
        let relations: Vec<&str> = snapshot.edge_triples().map(|(_, _, r)| r).collect();
        assert_eq!(relations, vec!["has_attribute", "supplies"]);
        assert_eq!(session.totals().parsed, 1);
        assert!(session.totals().tokens > 0);
    }

    #[test]
    fn test_service_failure_degrades_to_empty() {
        let mut provider = MockProvider::new(EMPTY);
        provider.add_error("broken");
        provider.add_empty("silent");
        provider.add_response("garbled", "I could not find anything, sorry");
        let docs = vec![
            Document::record("a", "broken chunk"),
            Document::record("b", "silent chunk"),
            Document::record("c", "garbled chunk"),
        ];
        let graph = SharedGraph::new();
        let session = session(provider, &docs, &graph);

        for (index, doc) in docs.iter().enumerate() {
            let stats = session
                .process_document(index, doc, &AtomicBool::new(false))
                .unwrap();
            assert_eq!(stats.edges_added, 0);
        }
        let totals = session.totals();
        assert_eq!(totals.empty, 2);
        assert_eq!(totals.degraded, 1);
        assert!(graph.snapshot().unwrap().is_empty());
    }

    #[test]
    fn test_empty_and_unchunked_documents_fail() {
        let docs = vec![Document::record("t", "text")];
        let graph = SharedGraph::new();
        let session = session(MockProvider::new(EMPTY), &docs, &graph);
        let cancel = AtomicBool::new(false);

        let err = session
            .process_document(0, &Document::record(" ", ""), &cancel)
            .unwrap_err();
        assert!(matches!(err, BuildError::Document { index: 0, .. }));

        let err = session
            .process_document(5, &Document::Raw("orphan".into()), &cancel)
            .unwrap_err();
        assert!(matches!(err, BuildError::NoChunks { index: 5, ref title } if title == "Unknown"));
    }

    #[test]
    fn test_cancel_flag_stops_document() {
        let docs = vec![Document::record("t", "text")];
        let graph = SharedGraph::new();
        let provider = MockProvider::new(EMPTY);
        let session = session(provider.clone(), &docs, &graph);

        let err = session
            .process_document(0, &docs[0], &AtomicBool::new(true))
            .unwrap_err();
        assert!(matches!(err, BuildError::Cancelled { index: 0 }));
        assert_eq!(provider.call_count(), 0);
    }

    #[test]
    fn test_result_after_cancel_is_discarded() {
        let mut provider = MockProvider::new(EMPTY);
        provider.add_response(
            "Boiler B-1",
            r#"{"attributes": {}, "triples": [["B-1", "supplies", "AHU-2"]], "entity_types": {}}"#,
        );
        let docs = vec![Document::record("Boilers", "Boiler B-1 heats AHU-2.")];
        let graph = SharedGraph::new();
        let session = session(provider.clone(), &docs, &graph);
        let chunk = Chunk::new(kgforge_domain::ChunkId::new("late"), "Boiler B-1 heats AHU-2.");

        let added = session.process_chunk(&chunk, &AtomicBool::new(true)).unwrap();
        assert_eq!(added, AssemblyStats::default());
        assert_eq!(provider.call_count(), 1);
        assert!(graph.snapshot().unwrap().is_empty());
    }

    #[test]
    fn test_agent_proposals_reach_next_prompt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("demo.json");

        let mut provider = MockProvider::new(EMPTY);
        provider.add_response(
            "first chunk",
            r#"{"attributes": {}, "triples": [], "entity_types": {}, "new_schema_types": {"nodes": ["reactor"]}}"#,
        );
        let docs = vec![
            Document::record("one", "first chunk"),
            Document::record("two", "second chunk"),
        ];
        let graph = SharedGraph::new();
        let session = session(provider.clone(), &docs, &graph)
            .with_schema_evolution(SchemaEvolutionManager::new().with_dataset("demo", &path));

        let cancel = AtomicBool::new(false);
        session.process_document(0, &docs[0], &cancel).unwrap();
        session.process_document(1, &docs[1], &cancel).unwrap();

        assert_eq!(session.schema().nodes, vec!["reactor"]);
        assert_eq!(session.totals().schema_updates, 1);
        assert_eq!(SchemaFile::new(&path).load().unwrap().nodes, vec!["reactor"]);

        let prompts = provider.prompts();
        assert!(!prompts[0].contains("reactor"));
        assert!(prompts[1].contains("reactor"));
    }

    #[test]
    fn test_schema_write_failure_keeps_building() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("demo.json");
        std::fs::write(&path, "{ not json").unwrap();

        let mut provider = MockProvider::new(EMPTY);
        provider.add_response(
            "chunk",
            r#"{"triples": [["a", "b", "c"]], "new_schema_types": {"relations": ["b"]}}"#,
        );
        let docs = vec![Document::record("one", "chunk")];
        let graph = SharedGraph::new();
        let session = session(provider, &docs, &graph)
            .with_schema_evolution(SchemaEvolutionManager::new().with_dataset("demo", &path));

        let stats = session
            .process_document(0, &docs[0], &AtomicBool::new(false))
            .unwrap();
        assert_eq!(stats.edges_added, 1);
        assert_eq!(session.schema(), Arc::new(Schema::default()));
    }
}
