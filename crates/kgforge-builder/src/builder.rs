//! Build orchestration
//!
//! One build runs these phases in order, each starting only after the previous
//! one has finished:
//!
//! 1. chunk every document and persist the chunk artifact
//! 2. extract and assemble on the worker pool
//! 3. deduplicate edges
//! 4. detect communities
//! 5. export relationship records

use crate::config::{BuildConfig, DatasetConfig};
use crate::controller::{ChunkingReport, ConcurrencyController};
use crate::corpus::load_corpus;
use crate::error::BuildError;
use crate::metrics::BuildMetrics;
use crate::schema_evolution::SchemaEvolutionManager;
use crate::session::BuildSession;
use kgforge_domain::{CommunityDetector, Document, LlmProvider};
use kgforge_extractor::{ChunkSplitter, PromptBuilder, ResponseValidator};
use kgforge_graph::{
    format_output, write_output, ComponentDetector, GraphAssembler, KnowledgeGraph,
    RelationshipRecord, SharedGraph,
};
use kgforge_store::{ChunkFile, ChunkStore, SchemaFile};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Everything a finished build produced
#[derive(Debug)]
pub struct BuildOutput {
    /// Final graph, deduplicated, communities included
    pub graph: KnowledgeGraph,
    /// Exported relationship records
    pub records: Vec<RelationshipRecord>,
    /// Build report
    pub metrics: BuildMetrics,
    /// Chunk artifact written in phase 1
    pub chunk_file: PathBuf,
    /// Graph export
    pub graph_file: PathBuf,
}

/// Chunking phase result
#[derive(Debug)]
pub struct ChunkingOutput {
    /// Registered chunks
    pub store: ChunkStore,
    /// Counts
    pub report: ChunkingReport,
    /// Chunk artifact
    pub chunk_file: PathBuf,
}

/// Builds the knowledge graph of one dataset
///
/// # Examples
///
/// ```no_run
/// use kgforge_builder::{BuildConfig, GraphBuilder};
/// use kgforge_llm::MockProvider;
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let builder = GraphBuilder::new(BuildConfig::default(), "hotpot", MockProvider::default())?;
/// let output = builder.build_from_corpus(None).await?;
/// println!("{}", output.metrics.summary());
/// # Ok(())
/// # }
/// ```
pub struct GraphBuilder<P, D = ComponentDetector> {
    config: BuildConfig,
    dataset: String,
    provider: Arc<P>,
    detector: D,
}

impl<P: LlmProvider + 'static> GraphBuilder<P> {
    /// Builder for `dataset` with the structural community detector
    pub fn new(
        config: BuildConfig,
        dataset: impl Into<String>,
        provider: P,
    ) -> Result<Self, BuildError> {
        config.validate().map_err(BuildError::Config)?;
        let dataset = dataset.into();
        config.dataset(&dataset)?;
        let detector = ComponentDetector::new(config.community.min_size);
        Ok(Self {
            config,
            dataset,
            provider: Arc::new(provider),
            detector,
        })
    }
}

impl<P, D> GraphBuilder<P, D>
where
    P: LlmProvider + 'static,
    D: CommunityDetector,
{
    /// Replace the community detector
    pub fn with_detector<E: CommunityDetector>(self, detector: E) -> GraphBuilder<P, E> {
        GraphBuilder {
            config: self.config,
            dataset: self.dataset,
            provider: self.provider,
            detector,
        }
    }

    /// Configuration in use
    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Dataset being built
    pub fn dataset(&self) -> &str {
        &self.dataset
    }

    fn dataset_config(&self) -> Result<&DatasetConfig, BuildError> {
        self.config.dataset(&self.dataset)
    }

    fn controller(&self) -> ConcurrencyController {
        let construction = &self.config.construction;
        ConcurrencyController::new(
            construction.workers(),
            construction.document_timeout(),
            construction.batch_timeout(),
        )
    }

    /// Phase 1 only: chunk the corpus and write the chunk artifact
    pub fn chunk(&self, documents: &[Document]) -> Result<ChunkingOutput, BuildError> {
        let construction = &self.config.construction;
        let splitter = ChunkSplitter::new(construction.splitter_config())?
            .whole_documents(construction.is_unchunked(&self.dataset));

        info!(dataset = %self.dataset, documents = documents.len(), "chunking all documents");
        let mut store = ChunkStore::new();
        let report = self
            .controller()
            .chunk_documents(&splitter, documents, &mut store);

        let file = ChunkFile::for_dataset(&self.config.output.chunks_dir, &self.dataset);
        let written = file.save(&store)?;
        info!(
            path = %file.path().display(),
            chunks = written,
            "chunks saved, intermediate results can be inspected"
        );

        Ok(ChunkingOutput {
            store,
            report,
            chunk_file: file.path().to_path_buf(),
        })
    }

    /// Load the corpus (`corpus` or the dataset's configured path) and build
    pub async fn build_from_corpus(&self, corpus: Option<&Path>) -> Result<BuildOutput, BuildError> {
        let path = match corpus {
            Some(path) => path.to_path_buf(),
            None => self.dataset_config()?.corpus_path.clone().ok_or_else(|| {
                BuildError::Config(format!("no corpus path configured for '{}'", self.dataset))
            })?,
        };
        let documents = load_corpus(&path)?;
        self.build(documents).await
    }

    /// Run every phase over `documents`
    pub async fn build(&self, documents: Vec<Document>) -> Result<BuildOutput, BuildError> {
        let dataset = self.dataset_config()?;
        let construction = &self.config.construction;
        let mut metrics = BuildMetrics::new(&self.dataset);
        metrics.documents = documents.len();
        info!(build = %metrics.build_id, dataset = %self.dataset, mode = ?construction.mode, "starting build");

        let schema = SchemaFile::new(&dataset.schema_path).load_or_default()?;

        let chunking = self.chunk(&documents)?;
        metrics.chunks = chunking.report.chunks;
        metrics.dropped_chunks = chunking.report.dropped;

        let graph = SharedGraph::new();
        let agent = construction.mode.is_agent();
        let mut session = BuildSession::new(
            self.dataset.clone(),
            self.provider.clone(),
            Arc::new(chunking.store),
            PromptBuilder::new(dataset.prompt_style)
                .agent(agent)
                .building_assets(dataset.hierarchy_synthesis),
            ResponseValidator::new().with_hierarchy_synthesis(dataset.hierarchy_synthesis),
            GraphAssembler::new(graph.clone(), construction.assembly_mode()),
            schema,
        );
        if agent && dataset.evolvable {
            session = session.with_schema_evolution(
                SchemaEvolutionManager::new()
                    .with_dataset(self.dataset.clone(), dataset.schema_path.clone()),
            );
        }
        let session = Arc::new(session);

        let batch = self
            .controller()
            .run(session.clone(), Arc::new(documents))
            .await;
        metrics.processed = batch.processed;
        metrics.failed = batch.failed;
        metrics.timed_out = batch.timed_out;
        metrics.deadline_hit = batch.deadline_hit;
        metrics.construction_time = batch.elapsed;

        let totals = session.totals();
        metrics.token_cost = totals.tokens;
        metrics.parsed_chunks = totals.parsed;
        metrics.degraded_chunks = totals.degraded;
        metrics.empty_chunks = totals.empty;
        metrics.schema_updates = totals.schema_updates;
        info!(token_cost = totals.tokens, "all documents finished");

        let assembled = graph.snapshot()?;
        metrics.before_dedup = assembled.stats();
        let mut final_graph = assembled.deduplicate();
        metrics.after_dedup = final_graph.stats();

        if self.config.community.enabled {
            match final_graph.detect_communities(&self.detector, self.config.community.struct_weight) {
                Ok(count) => metrics.communities = count,
                Err(e) => warn!(error = %e, "community detection skipped"),
            }
        }
        metrics.exported = final_graph.stats();

        let records = format_output(&final_graph);
        let graph_file = self.config.output.graph_path(&self.dataset);
        write_output(&graph_file, &records)?;

        info!("build finished\n{}", metrics.summary());
        Ok(BuildOutput {
            graph: final_graph,
            records,
            metrics,
            chunk_file: chunking.chunk_file,
            graph_file,
        })
    }
}
