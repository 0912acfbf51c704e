//! Chunk artifact persistence
//!
//! One line per chunk: `id: <id>\tChunk: <text>`. Newlines, tabs and backslashes in
//! the text are escaped so every chunk stays on its own line. Rewriting merges the
//! entries already on disk with the in-memory ones; on an id clash the in-memory
//! text wins, so repeated builds add to the file instead of replacing it.

use crate::{ChunkStore, StoreError};
use indexmap::IndexMap;
use kgforge_domain::ChunkId;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const ID_PREFIX: &str = "id: ";
const TEXT_PREFIX: &str = "Chunk: ";

/// The chunk artifact of one dataset
#[derive(Debug, Clone)]
pub struct ChunkFile {
    path: PathBuf,
}

impl ChunkFile {
    /// Chunk file at an explicit path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `{dir}/{dataset}.txt`
    pub fn for_dataset(dir: impl AsRef<Path>, dataset: &str) -> Self {
        Self::new(dir.as_ref().join(format!("{}.txt", dataset)))
    }

    /// Location of the artifact
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every well-formed entry; a missing file reads as empty
    ///
    /// Lines that do not follow the entry format are skipped.
    pub fn load(&self) -> Result<IndexMap<ChunkId, String>, StoreError> {
        let mut entries = IndexMap::new();
        if !self.path.exists() {
            return Ok(entries);
        }

        let content =
            fs::read_to_string(&self.path).map_err(|e| StoreError::io(&self.path, e))?;
        for line in content.lines() {
            if let Some((id, text)) = parse_line(line) {
                entries.insert(id, text);
            }
        }
        Ok(entries)
    }

    /// Merge the store's chunks into the file and rewrite it
    ///
    /// Returns the number of entries written. An unreadable existing file is logged
    /// and replaced by the in-memory entries.
    pub fn save(&self, store: &ChunkStore) -> Result<usize, StoreError> {
        let mut entries = match self.load() {
            Ok(existing) => existing,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to parse existing chunk file");
                IndexMap::new()
            }
        };
        for (id, text) in store.iter() {
            entries.insert(id.clone(), text.to_string());
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }

        let mut out = String::new();
        for (id, text) in &entries {
            out.push_str(&format_line(id, text));
            out.push('\n');
        }
        fs::write(&self.path, out).map_err(|e| StoreError::io(&self.path, e))?;

        info!(path = %self.path.display(), chunks = entries.len(), "chunk data saved");
        Ok(entries.len())
    }
}

fn format_line(id: &ChunkId, text: &str) -> String {
    format!("{}{}\t{}{}", ID_PREFIX, id, TEXT_PREFIX, escape(text))
}

fn parse_line(line: &str) -> Option<(ChunkId, String)> {
    let line = line.trim_end_matches('\r');
    let (head, tail) = line.split_once('\t')?;
    let id = head.strip_prefix(ID_PREFIX)?.trim();
    let text = tail.strip_prefix(TEXT_PREFIX)?;
    if id.is_empty() {
        return None;
    }
    Some((ChunkId::new(id), unescape(text)))
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out
}

fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_format() {
        let line = format_line(&ChunkId::new("Ab3_-x9Z"), "plain text");
        assert_eq!(line, "id: Ab3_-x9Z\tChunk: plain text");
        assert_eq!(
            parse_line(&line),
            Some((ChunkId::new("Ab3_-x9Z"), "plain text".to_string()))
        );
    }

    #[test]
    fn test_escaping_keeps_one_line() {
        let text = "## Heading\n\tindented \\ path";
        let line = format_line(&ChunkId::new("a"), text);
        assert!(!line.contains('\n'));
        assert_eq!(line.matches('\t').count(), 1);
        assert_eq!(parse_line(&line).unwrap().1, text);
    }

    #[test]
    fn test_unescape_keeps_unknown_sequences() {
        assert_eq!(unescape(r"C:\docs"), r"C:\docs");
        assert_eq!(unescape("trailing\\"), "trailing\\");
    }

    #[test]
    fn test_parse_rejects_foreign_lines() {
        assert!(parse_line("").is_none());
        assert!(parse_line("no tab here").is_none());
        assert!(parse_line("key: x\tChunk: y").is_none());
        assert!(parse_line("id: x\tText: y").is_none());
        assert!(parse_line("id: \tChunk: y").is_none());
    }
}
