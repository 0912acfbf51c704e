//! Corpus documents

/// One corpus record
///
/// Most datasets provide titled records. Older datasets ship bare values, which are
/// carried through as their textual form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Document {
    /// A `{title, text, ...}` record; other keys are ignored
    Record {
        /// Document title (may be empty)
        title: String,
        /// Document body
        text: String,
    },

    /// A legacy record carried as opaque text
    Raw(String),
}

impl Document {
    /// Create a titled record
    pub fn record(title: impl Into<String>, text: impl Into<String>) -> Self {
        Document::Record {
            title: title.into(),
            text: text.into(),
        }
    }

    /// Title of the document, empty for raw records
    pub fn title(&self) -> &str {
        match self {
            Document::Record { title, .. } => title,
            Document::Raw(_) => "",
        }
    }

    /// Text fed to the structural splitter: title, blank line, body
    pub fn full_text(&self) -> String {
        match self {
            Document::Record { title, text } => format!("{}\n\n{}", title, text),
            Document::Raw(raw) => raw.clone(),
        }
    }

    /// Text used when the dataset is not chunked: title and body on one line
    pub fn unchunked_text(&self) -> String {
        match self {
            Document::Record { title, text } => format!("{} {}", title, text).trim().to_string(),
            Document::Raw(raw) => raw.clone(),
        }
    }

    /// Whether the document carries no content at all
    pub fn is_empty(&self) -> bool {
        match self {
            Document::Record { title, text } => title.trim().is_empty() && text.trim().is_empty(),
            Document::Raw(raw) => raw.trim().is_empty(),
        }
    }
}
