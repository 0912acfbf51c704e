//! Additive schema growth from extraction-service proposals
//!
//! The schema file on disk is the source of truth: every evolution re-reads it,
//! appends what is new and writes it back. The read-modify-write runs under a
//! mutex, so concurrent workers proposing types for the same dataset never lose
//! each other's additions.

use crate::config::BuildConfig;
use crate::error::BuildError;
use kgforge_domain::{Schema, SchemaProposal};
use kgforge_store::SchemaFile;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};
use tracing::info;

/// Applies schema proposals to the schema files of evolvable datasets
///
/// # Examples
///
/// ```
/// use kgforge_builder::SchemaEvolutionManager;
/// use kgforge_domain::SchemaProposal;
///
/// let dir = tempfile::tempdir().unwrap();
/// let manager = SchemaEvolutionManager::new()
///     .with_dataset("novel", dir.path().join("novel.json"));
///
/// let proposal = SchemaProposal { nodes: vec!["character".into()], ..Default::default() };
/// let evolved = manager.evolve("novel", &proposal).unwrap().unwrap();
/// assert_eq!(evolved.nodes, vec!["character"]);
///
/// // Nothing new: no write, no new version
/// assert!(manager.evolve("novel", &proposal).unwrap().is_none());
/// // Unknown datasets are ignored
/// assert!(manager.evolve("other", &proposal).unwrap().is_none());
/// ```
#[derive(Debug, Default)]
pub struct SchemaEvolutionManager {
    files: HashMap<String, SchemaFile>,
    write_lock: Mutex<()>,
}

impl SchemaEvolutionManager {
    /// Manager with no evolvable datasets
    pub fn new() -> Self {
        Self::default()
    }

    /// Manager for every dataset marked `evolvable` in the configuration
    pub fn from_config(config: &BuildConfig) -> Self {
        config
            .datasets
            .iter()
            .filter(|(_, dataset)| dataset.evolvable)
            .fold(Self::new(), |manager, (name, dataset)| {
                manager.with_dataset(name.clone(), dataset.schema_path.clone())
            })
    }

    /// Register a dataset's schema file
    pub fn with_dataset(mut self, dataset: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.files.insert(dataset.into(), SchemaFile::new(path));
        self
    }

    /// Whether proposals for `dataset` are applied
    pub fn is_evolvable(&self, dataset: &str) -> bool {
        self.files.contains_key(dataset)
    }

    /// Apply a proposal to the dataset's schema file
    ///
    /// Returns the new schema version when at least one entry was added, `None`
    /// when nothing was new or the dataset is not evolvable. Read or write
    /// failures are returned; callers log them and keep building.
    pub fn evolve(
        &self,
        dataset: &str,
        proposal: &SchemaProposal,
    ) -> Result<Option<Schema>, BuildError> {
        let Some(file) = self.files.get(dataset) else {
            return Ok(None);
        };
        if proposal.is_empty() {
            return Ok(None);
        }

        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let current = file.load_or_default()?;
        let Some(next) = current.absorb(proposal) else {
            return Ok(None);
        };

        file.save(&next)?;
        info!(
            dataset,
            nodes = next.nodes.len(),
            relations = next.relations.len(),
            attributes = next.attributes.len(),
            "schema evolved"
        );
        Ok(Some(next))
    }
}
