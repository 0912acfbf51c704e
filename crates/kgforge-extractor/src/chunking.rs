//! Document splitting and smart merging

use crate::config::SplitterConfig;
use crate::error::ExtractorError;
use kgforge_domain::{ChunkId, Document};
use kgforge_store::ChunkStore;
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::{info, warn};

/// Heading markers, most specific first
const HEADING_MARKERS: [&str; 3] = ["#### ", "### ", "## "];

static KEYWORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\x{4E00}-\x{9FFF}]+|[A-Za-z]+|[A-Z0-9-]+").expect("keyword regex is valid")
});

static DEVICE_RECORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"#### 设备:.*?\((.*?)\)").expect("device record regex is valid")
});

/// Chunks produced for one document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentChunks {
    /// Chunk texts in document order
    pub texts: Vec<String>,

    /// Registered chunks in document order
    pub ids: Vec<(ChunkId, String)>,

    /// Chunks lost because no identifier could be allocated
    pub dropped: usize,
}

/// Turns documents into bounded, ordered chunks
#[derive(Debug, Clone)]
pub struct ChunkSplitter {
    config: SplitterConfig,
    whole_documents: bool,
}

impl ChunkSplitter {
    /// Create a splitter, rejecting an invalid configuration
    pub fn new(config: SplitterConfig) -> Result<Self, ExtractorError> {
        config.validate().map_err(ExtractorError::Config)?;
        Ok(Self {
            config,
            whole_documents: false,
        })
    }

    /// Keep every document as a single chunk (datasets that are not chunked)
    pub fn whole_documents(mut self, enabled: bool) -> Self {
        self.whole_documents = enabled;
        self
    }

    /// Splitter configuration
    pub fn config(&self) -> &SplitterConfig {
        &self.config
    }

    /// Split a document into chunk texts
    pub fn split(&self, document: &Document) -> Vec<String> {
        let chunks = if self.whole_documents {
            vec![document.unchunked_text()]
        } else {
            let full_text = document.full_text();
            structural_segments(&full_text)
                .into_iter()
                .flat_map(|segment| {
                    split_by_length(&segment, self.config.chunk_size, self.config.overlap)
                })
                .collect()
        };

        if chunks.len() > self.config.max_chunks {
            let original = chunks.len();
            let merged = smart_merge(chunks, &self.config);
            info!(from = original, to = merged.len(), "smart merge reduced chunk count");
            merged
        } else {
            chunks
        }
    }

    /// Split a document, register its chunks and record them against `index`
    ///
    /// A chunk whose identifier cannot be allocated is logged and dropped; the
    /// count is reported in [`DocumentChunks::dropped`].
    pub fn split_into(
        &self,
        document: &Document,
        index: usize,
        store: &mut ChunkStore,
    ) -> DocumentChunks {
        let texts = self.split(document);
        let mut ids = Vec::with_capacity(texts.len());
        let mut dropped = 0;

        for text in &texts {
            match store.register(text.clone()) {
                Ok(id) => ids.push((id, text.clone())),
                Err(e) => {
                    warn!(document = index, error = %e, "failed to register chunk, dropping it");
                    dropped += 1;
                }
            }
        }

        store.record_document(index, ids.iter().map(|(id, _)| id.clone()).collect());
        DocumentChunks {
            texts,
            ids,
            dropped,
        }
    }
}

/// Split by the deepest heading level that yields more than one segment
fn structural_segments(text: &str) -> Vec<String> {
    for marker in HEADING_MARKERS {
        let segments = split_by_heading(text, marker);
        if segments.len() > 1 {
            return segments;
        }
    }
    vec![text.to_string()]
}

/// Start a new segment at every line whose first non-blank text is `marker`
fn split_by_heading(text: &str, marker: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut buffer: Vec<&str> = Vec::new();

    for line in text.lines() {
        if line.trim_start().starts_with(marker) && !buffer.is_empty() {
            segments.push(buffer.join("\n").trim().to_string());
            buffer.clear();
        }
        buffer.push(line);
    }
    if !buffer.is_empty() {
        segments.push(buffer.join("\n").trim().to_string());
    }

    segments.retain(|segment| !segment.is_empty());
    segments
}

/// Fixed-size character windows; consecutive windows share `overlap` characters
fn split_by_length(text: &str, size: usize, overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= size {
        return vec![text.to_string()];
    }

    let mut windows = Vec::new();
    let mut start = 0;
    loop {
        let end = (start + size).min(chars.len());
        windows.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start = end.saturating_sub(overlap);
    }
    windows
}

/// Lower-cased keyword set: ideograph runs, letter runs and code-like runs of 2+ chars
fn keywords(text: &str) -> HashSet<String> {
    KEYWORD
        .find_iter(text)
        .map(|m| m.as_str())
        .filter(|word| word.chars().count() > 1)
        .map(str::to_lowercase)
        .collect()
}

/// Jaccard similarity of keyword sets; 0.0 when either set is empty
fn similarity(a: &str, b: &str) -> f64 {
    let ka = keywords(a);
    let kb = keywords(b);
    if ka.is_empty() || kb.is_empty() {
        return 0.0;
    }
    let intersection = ka.intersection(&kb).count();
    let union = ka.union(&kb).count();
    intersection as f64 / union as f64
}

fn should_merge(seed: &str, candidate: &str, config: &SplitterConfig) -> bool {
    let score = similarity(seed, candidate);
    let both_short = seed.chars().count() < config.short_chunk_len
        && candidate.chars().count() < config.short_chunk_len;
    score > config.similarity_threshold
        || (both_short && score > config.short_similarity_threshold)
}

/// Greedy similarity grouping, then length packing of whatever is left
fn smart_merge(chunks: Vec<String>, config: &SplitterConfig) -> Vec<String> {
    if chunks.len() <= config.merge_target {
        return chunks;
    }

    let mut merged = Vec::new();
    let mut remaining: Vec<String> = chunks;

    while !remaining.is_empty() && merged.len() < config.merge_target {
        let seed = remaining.remove(0);
        let mut group = vec![seed];

        let mut i = 0;
        while i < remaining.len() && group.len() < config.max_group_size {
            if should_merge(&group[0], &remaining[i], config) {
                group.push(remaining.remove(i));
            } else {
                i += 1;
            }
        }

        merged.push(join_group(group));
    }

    while !remaining.is_empty() {
        let mut group = Vec::new();
        let mut total = 0;
        while !remaining.is_empty() && total < config.pack_target_len {
            let chunk = remaining.remove(0);
            total += chunk.chars().count();
            group.push(chunk);
        }
        merged.push(if group.len() == 1 {
            group.remove(0)
        } else {
            group.join("\n\n")
        });
    }

    merged
}

/// Join a similarity group in original order, separated by blank lines
///
/// When every member is a device record, a member that repeats the previous
/// member's header line loses that line.
fn join_group(mut group: Vec<String>) -> String {
    if group.len() == 1 {
        return group.remove(0);
    }

    let all_devices = group.iter().all(|chunk| DEVICE_RECORD.is_match(chunk));
    let mut parts: Vec<String> = Vec::with_capacity(group.len());
    let mut previous_header: Option<String> = None;

    for chunk in &group {
        let trimmed = chunk.trim();
        let header = trimmed.lines().next().unwrap_or_default().to_string();

        let part = if all_devices && previous_header.as_deref() == Some(header.as_str()) {
            trimmed
                .split_once('\n')
                .map(|(_, rest)| rest.trim_start().to_string())
                .unwrap_or_default()
        } else {
            trimmed.to_string()
        };

        if !part.is_empty() {
            parts.push(part);
        }
        previous_header = Some(header);
    }

    parts.join("\n\n")
}
