//! Scheduling: sequential chunking, then one task per document
//!
//! Extraction runs on tokio's blocking pool; a semaphore bounds how many
//! documents are in flight. Blocking work cannot be interrupted, so deadlines
//! work through a per-document cancel flag: the controller stops waiting at the
//! deadline and the worker gives up before its next chunk. A worker keeps its
//! permit until its blocking call returns, so a late document still occupies
//! its slot.

use crate::session::{BuildSession, DocumentStats};
use kgforge_domain::{Document, LlmProvider};
use kgforge_extractor::ChunkSplitter;
use kgforge_store::ChunkStore;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;
use tracing::{error, info, warn};

/// Result of the chunking phase
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChunkingReport {
    /// Documents chunked
    pub documents: usize,
    /// Chunks registered
    pub chunks: usize,
    /// Chunks dropped for lack of an identifier
    pub dropped: usize,
}

/// How one document ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentOutcome {
    /// Every chunk was attempted
    Processed(DocumentStats),
    /// The document raised
    Failed(String),
    /// The per-document deadline passed
    TimedOut,
}

/// A document that did not complete
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentFailure {
    /// Document position in the corpus
    pub index: usize,
    /// Why it failed
    pub reason: String,
}

/// Result of the extraction phase
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Documents submitted
    pub total: usize,
    /// Documents completed
    pub processed: usize,
    /// Documents that failed, timeouts included
    pub failed: usize,
    /// Documents abandoned at their deadline
    pub timed_out: usize,
    /// Whether the batch deadline cut the phase short
    pub deadline_hit: bool,
    /// Failed documents, in completion order
    pub failures: Vec<DocumentFailure>,
    /// Chunks processed across completed documents
    pub chunks: usize,
    /// Chunks that failed inside completed documents
    pub failed_chunks: usize,
    /// Wall time of the phase
    pub elapsed: Duration,
}

impl BatchReport {
    fn new(total: usize) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    fn record(&mut self, index: usize, outcome: DocumentOutcome) {
        match outcome {
            DocumentOutcome::Processed(stats) => {
                self.processed += 1;
                self.chunks += stats.chunks;
                self.failed_chunks += stats.failed_chunks;
            }
            DocumentOutcome::Failed(reason) => {
                error!(document = index, %reason, "document failed");
                self.failed += 1;
                self.failures.push(DocumentFailure { index, reason });
            }
            DocumentOutcome::TimedOut => {
                error!(document = index, "document processing timed out");
                self.failed += 1;
                self.timed_out += 1;
                self.failures.push(DocumentFailure {
                    index,
                    reason: "timed out".to_string(),
                });
            }
        }
    }

    /// Documents neither processed nor failed
    pub fn unfinished(&self) -> usize {
        self.total.saturating_sub(self.processed + self.failed)
    }
}

/// Runs the chunking and extraction phases of a build
///
/// # Examples
///
/// ```
/// use kgforge_builder::ConcurrencyController;
/// use std::time::Duration;
///
/// let controller = ConcurrencyController::new(4, Duration::from_secs(180), Duration::from_secs(300));
/// assert_eq!(controller.workers(), 4);
/// ```
#[derive(Debug, Clone)]
pub struct ConcurrencyController {
    workers: usize,
    document_timeout: Duration,
    batch_timeout: Duration,
}

impl ConcurrencyController {
    /// Controller with a pool size and both deadlines
    pub fn new(workers: usize, document_timeout: Duration, batch_timeout: Duration) -> Self {
        Self {
            workers: workers.max(1),
            document_timeout,
            batch_timeout,
        }
    }

    /// Pool size
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Chunk every document in corpus order
    ///
    /// Runs to completion before any extraction starts. A document that yields
    /// no chunk, empty ones included, is logged; it fails later, in the extraction phase.
    pub fn chunk_documents(
        &self,
        splitter: &ChunkSplitter,
        documents: &[Document],
        store: &mut ChunkStore,
    ) -> ChunkingReport {
        let mut report = ChunkingReport {
            documents: documents.len(),
            ..ChunkingReport::default()
        };

        for (index, document) in documents.iter().enumerate() {
            if document.is_empty() {
                warn!(document = index + 1, total = documents.len(), "document is empty, not chunked");
                continue;
            }
            let chunks = splitter.split_into(document, index, store);
            report.chunks += chunks.ids.len();
            report.dropped += chunks.dropped;
            if chunks.ids.is_empty() {
                warn!(document = index + 1, total = documents.len(), "document produced no chunks");
            } else {
                info!(
                    document = index + 1,
                    total = documents.len(),
                    chunks = chunks.ids.len(),
                    "document chunked"
                );
            }
        }
        report
    }

    /// Process every document on the worker pool
    ///
    /// Documents run concurrently up to the pool size; chunks of one document run
    /// in order on one worker. A failing or late document is counted and never
    /// cancels its siblings. When the batch deadline passes, every in-flight
    /// document is cancelled and the documents not yet finished are reported as
    /// neither processed nor failed.
    pub async fn run<P>(
        &self,
        session: Arc<BuildSession<P>>,
        documents: Arc<Vec<Document>>,
    ) -> BatchReport
    where
        P: LlmProvider + 'static,
    {
        let total = documents.len();
        let started = Instant::now();
        let deadline = tokio::time::Instant::now() + self.batch_timeout;
        let permits = Arc::new(Semaphore::new(self.workers));
        let mut cancels = Vec::with_capacity(total);
        let mut tasks = JoinSet::new();

        info!(documents = total, workers = self.workers, "starting extraction");
        for index in 0..total {
            let cancel = Arc::new(AtomicBool::new(false));
            cancels.push(cancel.clone());
            let session = session.clone();
            let documents = documents.clone();
            let permits = permits.clone();
            let document_timeout = self.document_timeout;

            tasks.spawn(async move {
                let outcome = match permits.acquire_owned().await {
                    Ok(permit) => {
                        run_document(session, documents, index, cancel, permit, document_timeout)
                            .await
                    }
                    Err(e) => DocumentOutcome::Failed(e.to_string()),
                };
                (index, outcome)
            });
        }

        let mut report = BatchReport::new(total);
        loop {
            match tokio::time::timeout_at(deadline, tasks.join_next()).await {
                Ok(Some(Ok((index, outcome)))) => {
                    report.record(index, outcome);
                    log_progress(&report, started.elapsed());
                }
                Ok(Some(Err(e))) => {
                    error!(error = %e, "document task aborted");
                    report.failed += 1;
                }
                Ok(None) => break,
                Err(_) => {
                    report.deadline_hit = true;
                    for cancel in &cancels {
                        cancel.store(true, Ordering::Relaxed);
                    }
                    tasks.abort_all();
                    warn!(
                        unfinished = report.unfinished(),
                        timeout_secs = self.batch_timeout.as_secs(),
                        "batch deadline reached, abandoning remaining documents"
                    );
                    break;
                }
            }
        }

        report.elapsed = started.elapsed();
        info!(
            processed = report.processed,
            failed = report.failed,
            total,
            elapsed_secs = report.elapsed.as_secs_f64(),
            "extraction finished"
        );
        report
    }
}

async fn run_document<P>(
    session: Arc<BuildSession<P>>,
    documents: Arc<Vec<Document>>,
    index: usize,
    cancel: Arc<AtomicBool>,
    permit: OwnedSemaphorePermit,
    document_timeout: Duration,
) -> DocumentOutcome
where
    P: LlmProvider + 'static,
{
    let worker_cancel = cancel.clone();
    let worker = tokio::task::spawn_blocking(move || {
        let result = session.process_document(index, &documents[index], &worker_cancel);
        drop(permit);
        result
    });

    match tokio::time::timeout(document_timeout, worker).await {
        Ok(Ok(Ok(stats))) => DocumentOutcome::Processed(stats),
        Ok(Ok(Err(e))) => DocumentOutcome::Failed(e.to_string()),
        Ok(Err(e)) => DocumentOutcome::Failed(format!("worker panicked: {}", e)),
        Err(_) => {
            cancel.store(true, Ordering::Relaxed);
            DocumentOutcome::TimedOut
        }
    }
}

fn log_progress(report: &BatchReport, elapsed: Duration) {
    let done = report.processed + report.failed;
    let per_doc = if done > 0 {
        elapsed.as_secs_f64() / done as f64
    } else {
        0.0
    };
    let eta_minutes = report.total.saturating_sub(done) as f64 * per_doc / 60.0;
    info!(
        "Progress: {}/{} documents processed ({:.1}%) [{} failed] Avg: {:.1}s/doc ETA: {:.1} minutes",
        report.processed,
        report.total,
        done as f64 * 100.0 / report.total.max(1) as f64,
        report.failed,
        per_doc,
        eta_minutes
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use kgforge_extractor::{PromptBuilder, PromptStyle, ResponseValidator, SplitterConfig};
    use kgforge_domain::Schema;
    use kgforge_graph::{AssemblyMode, GraphAssembler, SharedGraph};
    use kgforge_llm::MockProvider;
    use std::sync::atomic::AtomicUsize;

    /// Sleeps on every call and remembers the most calls seen in flight at once
    #[derive(Default)]
    struct GaugedProvider {
        delay: Duration,
        active: AtomicUsize,
        peak: AtomicUsize,
    }

    impl LlmProvider for GaugedProvider {
        type Error = std::convert::Infallible;

        fn generate(&self, _prompt: &str) -> Result<Option<String>, Self::Error> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(self.delay);
            self.active.fetch_sub(1, Ordering::SeqCst);
            Ok(Some(triple_response("Unit")))
        }
    }

    fn triple_response(subject: &str) -> String {
        format!(
            r#"{{"attributes": {{}}, "triples": [["{}", "serves", "Plant"]], "entity_types": {{}}}}"#,
            subject
        )
    }

    fn setup(
        provider: MockProvider,
        documents: &[Document],
        controller: &ConcurrencyController,
    ) -> (Arc<BuildSession<MockProvider>>, SharedGraph) {
        let splitter = ChunkSplitter::new(SplitterConfig::default()).unwrap();
        let mut store = ChunkStore::with_seed(1);
        controller.chunk_documents(&splitter, documents, &mut store);

        let graph = SharedGraph::new();
        let session = BuildSession::new(
            "demo",
            provider,
            Arc::new(store),
            PromptBuilder::new(PromptStyle::General),
            ResponseValidator::new(),
            GraphAssembler::new(graph.clone(), AssemblyMode::Buffered),
            Schema::default(),
        );
        (Arc::new(session), graph)
    }

    #[test]
    fn test_chunking_report() {
        let controller = ConcurrencyController::new(2, Duration::from_secs(5), Duration::from_secs(5));
        let splitter = ChunkSplitter::new(SplitterConfig::default()).unwrap();
        let mut store = ChunkStore::new();
        let documents = vec![
            Document::record("A", "## one\nfirst\n## two\nsecond"),
            Document::record("B", "short"),
            Document::record("", "  "),
        ];

        let report = controller.chunk_documents(&splitter, &documents, &mut store);
        assert_eq!(report.documents, 3);
        assert_eq!(report.chunks, store.len());
        assert_eq!(store.document_count(), 2);
        assert_eq!(report.dropped, 0);
    }

    #[tokio::test]
    async fn test_all_documents_processed() {
        let controller = ConcurrencyController::new(3, Duration::from_secs(10), Duration::from_secs(30));
        let mut provider = MockProvider::default();
        let documents: Vec<Document> = (0..6)
            .map(|i| Document::record(format!("Doc {}", i), format!("Unit-{} text", i)))
            .collect();
        for i in 0..6 {
            provider.add_response(format!("Unit-{} text", i), triple_response(&format!("Unit-{}", i)));
        }
        let (session, graph) = setup(provider, &documents, &controller);

        let report = controller.run(session, Arc::new(documents)).await;
        assert_eq!(report.processed, 6);
        assert_eq!(report.failed, 0);
        assert!(!report.deadline_hit);
        assert_eq!(report.chunks, 6);

        let snapshot = graph.snapshot().unwrap();
        assert_eq!(snapshot.entity_count_named("Plant"), 1);
        assert_eq!(snapshot.edge_count(), 6);
    }

    #[tokio::test]
    async fn test_document_timeout_is_isolated() {
        let controller =
            ConcurrencyController::new(4, Duration::from_millis(200), Duration::from_secs(30));
        let mut provider = MockProvider::default();
        provider.add_delay("slow text", Duration::from_millis(800));
        let documents = vec![
            Document::record("fast", "fast text"),
            Document::record("slow", "slow text"),
        ];
        let (session, _graph) = setup(provider, &documents, &controller);

        let report = controller.run(session, Arc::new(documents)).await;
        assert_eq!(report.processed, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.timed_out, 1);
        assert_eq!(report.failures[0].index, 1);
    }

    #[tokio::test]
    async fn test_batch_deadline_leaves_documents_unfinished() {
        let controller =
            ConcurrencyController::new(1, Duration::from_secs(10), Duration::from_millis(300));
        let mut provider = MockProvider::default();
        provider.add_delay("text", Duration::from_millis(200));
        let documents: Vec<Document> = (0..5)
            .map(|i| Document::record(format!("Doc {}", i), format!("text {}", i)))
            .collect();
        let (session, _graph) = setup(provider, &documents, &controller);

        let report = controller.run(session, Arc::new(documents)).await;
        assert!(report.deadline_hit);
        assert!(report.processed < 5);
        assert_eq!(report.failed, 0);
        assert!(report.unfinished() > 0);
    }

    #[tokio::test]
    async fn test_timed_out_documents_keep_their_worker_slot() {
        let controller =
            ConcurrencyController::new(1, Duration::from_millis(50), Duration::from_secs(30));
        let documents: Vec<Document> = (0..4)
            .map(|i| Document::record(format!("Doc {}", i), format!("Unit-{} text", i)))
            .collect();
        let splitter = ChunkSplitter::new(SplitterConfig::default()).unwrap();
        let mut store = ChunkStore::with_seed(3);
        controller.chunk_documents(&splitter, &documents, &mut store);

        let provider = Arc::new(GaugedProvider {
            delay: Duration::from_millis(300),
            ..GaugedProvider::default()
        });
        let graph = SharedGraph::new();
        let session = BuildSession::new(
            "demo",
            provider.clone(),
            Arc::new(store),
            PromptBuilder::new(PromptStyle::General),
            ResponseValidator::new(),
            GraphAssembler::new(graph.clone(), AssemblyMode::Buffered),
            Schema::default(),
        );

        let report = controller.run(Arc::new(session), Arc::new(documents)).await;
        assert_eq!(report.timed_out, 4);
        assert_eq!(report.processed, 0);
        assert_eq!(provider.peak.load(Ordering::SeqCst), 1);
        assert!(graph.snapshot().unwrap().is_empty());
    }
}
