//! Per-dataset schema persistence

use crate::StoreError;
use kgforge_domain::Schema;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A dataset's schema JSON file (`Nodes`, `Relations`, `Attributes`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaFile {
    path: PathBuf,
}

impl SchemaFile {
    /// Schema file at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the file exists
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Read and parse the schema
    pub fn load(&self) -> Result<Schema, StoreError> {
        let content =
            fs::read_to_string(&self.path).map_err(|e| StoreError::io(&self.path, e))?;
        serde_json::from_str(&content).map_err(|e| StoreError::json(&self.path, e))
    }

    /// Read the schema, or an empty one when the file is absent
    pub fn load_or_default(&self) -> Result<Schema, StoreError> {
        if self.exists() {
            self.load()
        } else {
            debug!(path = %self.path.display(), "schema file absent, using empty schema");
            Ok(Schema::default())
        }
    }

    /// Write the schema as pretty JSON, creating parent directories
    pub fn save(&self, schema: &Schema) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
            }
        }
        let json =
            serde_json::to_string_pretty(schema).map_err(|e| StoreError::json(&self.path, e))?;
        fs::write(&self.path, json).map_err(|e| StoreError::io(&self.path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_an_error_for_load() {
        let dir = tempfile::tempdir().unwrap();
        let file = SchemaFile::new(dir.path().join("absent.json"));
        assert!(matches!(file.load(), Err(StoreError::Io { .. })));
        assert_eq!(file.load_or_default().unwrap(), Schema::default());
    }

    #[test]
    fn test_invalid_json_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(SchemaFile::new(path).load(), Err(StoreError::Json { .. })));
    }
}
