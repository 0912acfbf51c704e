//! Integration tests for kgforge-builder
//!
//! Whole builds against a mock extraction service, with every artifact written
//! to a temporary directory.

use kgforge_builder::{
    BuildConfig, BuildError, ConstructionMode, DatasetConfig, GraphBuilder, OutputConfig,
};
use kgforge_domain::{Document, Schema};
use kgforge_graph::{RelationshipRecord, MEMBER_OF};
use kgforge_llm::MockProvider;
use kgforge_store::{ChunkFile, SchemaFile};
use proptest::prelude::*;
use std::collections::BTreeSet;
use std::path::Path;
use tempfile::TempDir;

const DATASET: &str = "demo";

fn config(dir: &Path) -> BuildConfig {
    let mut config = BuildConfig::default();
    config.output = OutputConfig {
        chunks_dir: dir.join("chunks"),
        graphs_dir: dir.join("graphs"),
    };
    config.construction.max_workers = 4;
    config.construction.document_timeout_secs = 10;
    config.construction.batch_timeout_secs = 30;
    config.datasets.insert(
        DATASET.to_string(),
        DatasetConfig {
            schema_path: dir.join("demo_schema.json"),
            evolvable: true,
            ..DatasetConfig::default()
        },
    );
    config
}

fn supplies(subject: &str, object: &str) -> String {
    format!(
        r#"{{"attributes": {{"{s}": ["flow: 20m3/h"]}}, "triples": [["{s}", "供应", "{o}"]], "entity_types": {{"{s}": "asset"}}}}"#,
        s = subject,
        o = object
    )
}

#[tokio::test]
async fn test_full_build_writes_artifacts() {
    let dir = TempDir::new().unwrap();
    let mut provider = MockProvider::default();
    provider.add_response("Pump P-1 feeds", supplies("P-1", "AHU-1"));
    provider.add_error("broken service");

    let builder = GraphBuilder::new(config(dir.path()), DATASET, provider).unwrap();
    let documents = vec![
        Document::record("Pumps", "Pump P-1 feeds AHU-1."),
        Document::record("Outage", "broken service today"),
        Document::record("", ""),
    ];

    let output = builder.build(documents).await.unwrap();
    let metrics = &output.metrics;
    assert_eq!(metrics.documents, 3);
    assert_eq!(metrics.processed, 2);
    assert_eq!(metrics.failed, 1);
    assert_eq!(metrics.parsed_chunks, 1);
    assert_eq!(metrics.empty_chunks, 1);
    assert_eq!(metrics.after_dedup.edges, 2);
    assert_eq!(metrics.communities, 1);
    assert_eq!(metrics.exported.edges, 4);
    assert!(metrics.token_cost > 0);

    let chunks = ChunkFile::new(&output.chunk_file).load().unwrap();
    assert_eq!(chunks.len(), 2);
    assert!(output.chunk_file.ends_with("chunks/demo.txt"));

    let written: Vec<RelationshipRecord> =
        serde_json::from_str(&std::fs::read_to_string(&output.graph_file).unwrap()).unwrap();
    assert_eq!(written, output.records);
    assert_eq!(written.len(), output.graph.edge_count());
    assert!(written.iter().any(|r| r.relation == "supplies"));
    assert_eq!(written.iter().filter(|r| r.relation == MEMBER_OF).count(), 2);
}

#[tokio::test]
async fn test_failed_documents_do_not_block_others() {
    let dir = TempDir::new().unwrap();
    let mut config = config(dir.path());
    config.construction.document_timeout_secs = 1;
    config.community.enabled = false;

    let mut provider = MockProvider::default();
    provider.add_delay("stalled unit", std::time::Duration::from_secs(3));
    for i in 0..5 {
        provider.add_response(format!("Unit-{} feeds", i), supplies(&format!("Unit-{}", i), "Plant"));
    }

    let mut documents: Vec<Document> = (0..5)
        .map(|i| Document::record(format!("Doc {}", i), format!("Unit-{} feeds the plant.", i)))
        .collect();
    documents.push(Document::record("Stalled", "stalled unit waits"));
    documents.push(Document::record("", "   "));

    let builder = GraphBuilder::new(config, DATASET, provider).unwrap();
    let output = builder.build(documents).await.unwrap();

    assert_eq!(output.metrics.processed, 5);
    assert_eq!(output.metrics.failed, 2);
    assert_eq!(output.metrics.timed_out, 1);
    assert_eq!(output.graph.entity_count_named("Plant"), 1);
    assert_eq!(
        output.records.iter().filter(|r| r.relation == "supplies").count(),
        5
    );
}

#[tokio::test]
async fn test_concurrent_workers_share_entities() {
    let dir = TempDir::new().unwrap();
    let mut config = config(dir.path());
    config.construction.max_workers = 8;
    config.community.enabled = false;

    let mut provider = MockProvider::default();
    for i in 0..24 {
        provider.add_response(format!("Unit-{} feeds", i), supplies(&format!("Unit-{}", i), "Plant"));
    }
    let documents: Vec<Document> = (0..24)
        .map(|i| Document::record(format!("Doc {}", i), format!("Unit-{} feeds the plant.", i)))
        .collect();

    let builder = GraphBuilder::new(config, DATASET, provider).unwrap();
    let output = builder.build(documents).await.unwrap();

    assert_eq!(output.metrics.processed, 24);
    assert_eq!(output.graph.entity_count_named("Plant"), 1);
    assert_eq!(output.graph.stats().entities, 25);
    assert_eq!(output.metrics.duplicate_edges(), 0);
}

#[tokio::test]
async fn test_agent_build_evolves_schema_file() {
    let dir = TempDir::new().unwrap();
    let mut config = config(dir.path());
    config.construction.mode = ConstructionMode::Agent;
    config.community.enabled = false;

    let schema_file = SchemaFile::new(dir.path().join("demo_schema.json"));
    schema_file
        .save(&Schema {
            nodes: vec!["asset".into()],
            relations: vec!["supplies".into()],
            attributes: vec![],
        })
        .unwrap();

    let proposal = r#"{"triples": [["V-1", "feeds", "P-1"]], "new_schema_types": {"nodes": ["valve"], "relations": ["feeds"]}}"#;
    let mut provider = MockProvider::default();
    provider.add_response("Valve V-1", proposal);
    provider.add_response("Valve V-2", proposal.replace("V-1", "V-2"));
    let handle = provider.clone();

    let builder = GraphBuilder::new(config, DATASET, provider).unwrap();
    let output = builder
        .build(vec![
            Document::record("V1", "Valve V-1 feeds pump P-1."),
            Document::record("V2", "Valve V-2 feeds pump P-1."),
        ])
        .await
        .unwrap();

    assert_eq!(output.metrics.schema_updates, 1);
    let evolved = schema_file.load().unwrap();
    assert_eq!(evolved.nodes, vec!["asset", "valve"]);
    assert_eq!(evolved.relations, vec!["supplies", "feeds"]);

    assert!(handle
        .prompts()
        .iter()
        .all(|prompt| prompt.contains("new_schema_types")));
}

#[tokio::test]
async fn test_noagent_build_leaves_schema_alone() {
    let dir = TempDir::new().unwrap();
    let mut provider = MockProvider::default();
    provider.add_response(
        "Valve V-1",
        r#"{"triples": [], "new_schema_types": {"nodes": ["valve"]}}"#,
    );

    let builder = GraphBuilder::new(config(dir.path()), DATASET, provider).unwrap();
    let output = builder
        .build(vec![Document::record("V1", "Valve V-1 feeds pump P-1.")])
        .await
        .unwrap();

    assert_eq!(output.metrics.schema_updates, 0);
    assert!(!dir.path().join("demo_schema.json").exists());
}

#[tokio::test]
async fn test_build_from_corpus_file() {
    let dir = TempDir::new().unwrap();
    let corpus = dir.path().join("corpus.json");
    std::fs::write(
        &corpus,
        r#"[{'title': 'Pumps', 'text': 'Pump P-1 feeds AHU-1.'}, {"title": "Fans", "text": "Fan F-2 serves level 2."},]"#,
    )
    .unwrap();

    let mut config = config(dir.path());
    if let Some(dataset) = config.datasets.get_mut(DATASET) {
        dataset.corpus_path = Some(corpus);
    }
    let mut provider = MockProvider::default();
    provider.add_response("Pump P-1 feeds", supplies("P-1", "AHU-1"));

    let builder = GraphBuilder::new(config, DATASET, provider).unwrap();
    let output = builder.build_from_corpus(None).await.unwrap();
    assert_eq!(output.metrics.documents, 2);
    assert_eq!(output.metrics.processed, 2);
    assert!(output.graph_file.ends_with("graphs/demo_new.json"));
}

#[tokio::test]
async fn test_missing_corpus_path_is_a_config_error() {
    let dir = TempDir::new().unwrap();
    let builder = GraphBuilder::new(config(dir.path()), DATASET, MockProvider::default()).unwrap();
    let err = builder.build_from_corpus(None).await.unwrap_err();
    assert!(matches!(err, BuildError::Config(_)));
}

#[test]
fn test_unknown_dataset_is_rejected() {
    let dir = TempDir::new().unwrap();
    let result = GraphBuilder::new(config(dir.path()), "nope", MockProvider::default());
    assert!(matches!(result, Err(BuildError::UnknownDataset(ref name)) if name == "nope"));
}

#[test]
fn test_invalid_config_is_rejected() {
    let dir = TempDir::new().unwrap();
    let mut config = config(dir.path());
    config.construction.max_workers = 0;
    let result = GraphBuilder::new(config, DATASET, MockProvider::default());
    assert!(matches!(result, Err(BuildError::Config(_))));
}

#[test]
fn test_unchunked_dataset_keeps_documents_whole() {
    let dir = TempDir::new().unwrap();
    let mut config = config(dir.path());
    config.construction.datasets_no_chunk = vec![DATASET.to_string()];

    let builder = GraphBuilder::new(config, DATASET, MockProvider::default()).unwrap();
    let documents = vec![
        Document::record("Plant", "## AHU-1\nServes level 3.\n## P-1\nFeeds AHU-1."),
        Document::record("Fans", "## F-1\nExhaust.\n## F-2\nSupply."),
    ];
    let chunking = builder.chunk(&documents).unwrap();

    assert_eq!(chunking.report.chunks, 2);
    assert_eq!(ChunkFile::new(&chunking.chunk_file).load().unwrap().len(), 2);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(12))]

    /// Property: whatever the mix of documents and workers, each name is one entity
    #[test]
    fn test_entity_names_unique_across_workers(
        links in prop::collection::vec((0u8..5, 0u8..5), 1..12),
        workers in 1usize..6,
    ) {
        let dir = TempDir::new().unwrap();
        let mut config = config(dir.path());
        config.construction.max_workers = workers;
        config.community.enabled = false;

        let mut provider = MockProvider::default();
        let mut names = BTreeSet::new();
        let documents: Vec<Document> = links
            .iter()
            .enumerate()
            .map(|(i, (from, to))| {
                let (from, to) = (format!("Unit-{}", from), format!("Unit-{}", to));
                provider.add_response(format!("Doc-{} body", i), supplies(&from, &to));
                names.insert(from);
                names.insert(to);
                Document::record(format!("Doc {}", i), format!("Doc-{} body", i))
            })
            .collect();

        let runtime = tokio::runtime::Runtime::new().unwrap();
        let builder = GraphBuilder::new(config, DATASET, provider).unwrap();
        let output = runtime.block_on(builder.build(documents)).unwrap();

        prop_assert_eq!(output.metrics.processed, links.len());
        prop_assert_eq!(output.graph.stats().entities, names.len());
        for name in &names {
            prop_assert_eq!(output.graph.entity_count_named(name), 1);
        }
    }
}
