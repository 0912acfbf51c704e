//! Corpus loading
//!
//! Corpora are JSON arrays of `{title, text, ...}` records, sometimes hand-edited
//! or produced by scripts that leave trailing commas behind. The file goes through
//! the same lenient repair as extraction responses.

use crate::error::BuildError;
use kgforge_domain::Document;
use kgforge_extractor::repair;
use serde_json::Value;
use std::path::Path;
use tracing::info;

/// Read and decode a corpus file
pub fn load_corpus(path: impl AsRef<Path>) -> Result<Vec<Document>, BuildError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| BuildError::Corpus {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let documents = parse_corpus(&content).map_err(|reason| BuildError::Corpus {
        path: path.to_path_buf(),
        reason,
    })?;
    info!(path = %path.display(), documents = documents.len(), "corpus loaded");
    Ok(documents)
}

/// Decode corpus text
///
/// An array yields one document per element; a lone object is a one-document
/// corpus. Objects become records (missing `title`/`text` read as empty), any
/// other element is carried as its text.
///
/// # Examples
///
/// ```
/// use kgforge_builder::parse_corpus;
/// use kgforge_domain::Document;
///
/// let docs = parse_corpus(r#"[{"title": "AHU-1", "text": "Serves level 3.", "id": 7}, "legacy",]"#).unwrap();
/// assert_eq!(docs[0], Document::record("AHU-1", "Serves level 3."));
/// assert_eq!(docs[1], Document::Raw("legacy".into()));
/// ```
pub fn parse_corpus(text: &str) -> Result<Vec<Document>, String> {
    match repair(text).map_err(|e| e.to_string())? {
        Value::Array(items) => Ok(items.into_iter().map(document_from_value).collect()),
        object @ Value::Object(_) => Ok(vec![document_from_value(object)]),
        other => Err(format!("expected a list of documents, found {}", kind(&other))),
    }
}

fn document_from_value(value: Value) -> Document {
    match value {
        Value::Object(map) => Document::Record {
            title: map.get("title").map(text_of).unwrap_or_default(),
            text: map.get("text").map(text_of).unwrap_or_default(),
        },
        other => Document::Raw(text_of(&other)),
    }
}

fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_and_raw_values() {
        let docs = parse_corpus(r#"[{"title": "T", "text": "body"}, {"text": 42}, 3.5, null]"#).unwrap();
        assert_eq!(docs[0], Document::record("T", "body"));
        assert_eq!(docs[1], Document::record("", "42"));
        assert_eq!(docs[2], Document::Raw("3.5".into()));
        assert_eq!(docs[3], Document::Raw(String::new()));
        assert!(docs[3].is_empty());
    }

    #[test]
    fn test_lenient_decode() {
        let docs = parse_corpus("[{'title': 'A', 'text': 'x',},]").unwrap();
        assert_eq!(docs, vec![Document::record("A", "x")]);
    }

    #[test]
    fn test_single_object() {
        let docs = parse_corpus(r#"{"title": "only", "text": "one"}"#).unwrap();
        assert_eq!(docs.len(), 1);
    }

    #[test]
    fn test_rejects_scalars_and_garbage() {
        assert!(parse_corpus("42").is_err());
        assert!(parse_corpus("no json here").is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_corpus("/nonexistent/corpus.json").unwrap_err();
        assert!(matches!(err, BuildError::Corpus { .. }));
    }
}
