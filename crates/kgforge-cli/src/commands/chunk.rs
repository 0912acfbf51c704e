//! Chunk command implementation.

use crate::cli::ChunkArgs;
use crate::commands::service_builder;
use crate::error::{CliError, Result};
use kgforge_builder::{load_corpus, BuildConfig};
use std::path::PathBuf;

/// Corpus path from the command line, else from the dataset configuration.
pub fn corpus_path(config: &BuildConfig, dataset: &str, explicit: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path);
    }
    config.dataset(dataset)?.corpus_path.clone().ok_or_else(|| {
        CliError::Config(format!(
            "no corpus for dataset '{}': pass --corpus or set datasets.{}.corpus_path",
            dataset, dataset
        ))
    })
}

/// Execute the chunk command.
pub fn execute_chunk(args: ChunkArgs, config: BuildConfig) -> Result<()> {
    let path = corpus_path(&config, &args.dataset, args.corpus)?;
    let documents = load_corpus(&path)?;
    let builder = service_builder(config, &args.dataset)?;

    let chunking = builder.chunk(&documents)?;
    println!(
        "Chunked {} documents into {} chunks ({} dropped)",
        chunking.report.documents, chunking.report.chunks, chunking.report.dropped
    );
    println!("Chunks:  {}", chunking.chunk_file.display());
    Ok(())
}
