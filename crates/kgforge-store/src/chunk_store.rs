//! In-memory chunk registry

use crate::StoreError;
use indexmap::IndexMap;
use kgforge_domain::{Chunk, ChunkId};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

/// Alphabet for chunk identifiers (URL-safe, 64 symbols)
const ID_ALPHABET: &[u8] = b"_-0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Identifier length
pub const DEFAULT_ID_LENGTH: usize = 8;

/// Draws before registration gives up
pub const DEFAULT_MAX_ATTEMPTS: usize = 8;

/// Chunk id to text, plus the document index to chunk-id list mapping
///
/// Append-only: chunks are never removed or replaced during a build.
#[derive(Debug)]
pub struct ChunkStore {
    chunks: IndexMap<ChunkId, String>,
    documents: IndexMap<usize, Vec<ChunkId>>,
    rng: StdRng,
    id_length: usize,
    max_attempts: usize,
}

impl ChunkStore {
    /// Create an empty store with an entropy-seeded id generator
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Create an empty store with a reproducible id sequence
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            chunks: IndexMap::new(),
            documents: IndexMap::new(),
            rng,
            id_length: DEFAULT_ID_LENGTH,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Register a chunk under a fresh identifier
    ///
    /// Identifiers that collide with an existing chunk are redrawn; after
    /// [`DEFAULT_MAX_ATTEMPTS`] collisions registration fails and nothing is stored.
    pub fn register(&mut self, text: impl Into<String>) -> Result<ChunkId, StoreError> {
        let text = text.into();
        for attempt in 1..=self.max_attempts {
            let id = self.draw_id();
            if self.chunks.contains_key(&id) {
                debug!(chunk_id = %id, attempt, "chunk id collision, redrawing");
                continue;
            }
            self.chunks.insert(id.clone(), text);
            return Ok(id);
        }
        Err(StoreError::ChunkIdExhausted(self.max_attempts))
    }

    /// Insert a chunk under a known identifier
    pub fn insert(&mut self, id: ChunkId, text: impl Into<String>) -> Result<(), StoreError> {
        if self.chunks.contains_key(&id) {
            return Err(StoreError::DuplicateChunkId(id.to_string()));
        }
        self.chunks.insert(id, text.into());
        Ok(())
    }

    fn draw_id(&mut self) -> ChunkId {
        let id: String = (0..self.id_length)
            .map(|_| ID_ALPHABET[self.rng.gen_range(0..ID_ALPHABET.len())] as char)
            .collect();
        ChunkId::new(id)
    }

    /// Record the chunk ids produced for a document, in chunk order
    ///
    /// Ids that are not registered are ignored.
    pub fn record_document(&mut self, index: usize, ids: Vec<ChunkId>) {
        let ids: Vec<ChunkId> = ids
            .into_iter()
            .filter(|id| self.chunks.contains_key(id))
            .collect();
        self.documents.insert(index, ids);
    }

    /// Text of a chunk
    pub fn get(&self, id: &ChunkId) -> Option<&str> {
        self.chunks.get(id).map(String::as_str)
    }

    /// Whether a chunk is registered
    pub fn contains(&self, id: &ChunkId) -> bool {
        self.chunks.contains_key(id)
    }

    /// Chunk ids recorded for a document
    pub fn document_chunk_ids(&self, index: usize) -> Option<&[ChunkId]> {
        self.documents.get(&index).map(Vec::as_slice)
    }

    /// Chunks belonging to a document, in order
    ///
    /// The document index is authoritative. Only when it yields nothing are chunks
    /// whose text contains the (non-empty) title used instead; that match is
    /// best-effort and can pick up chunks of other documents sharing a common title.
    pub fn chunks_for_document(&self, index: usize, title: &str) -> Vec<Chunk> {
        let indexed: Vec<Chunk> = self
            .document_chunk_ids(index)
            .unwrap_or_default()
            .iter()
            .filter_map(|id| self.chunk(id))
            .collect();
        if !indexed.is_empty() {
            return indexed;
        }

        let title = title.trim();
        if title.is_empty() {
            return Vec::new();
        }

        debug!(document = index, title, "no indexed chunks, falling back to title match");
        self.chunks
            .iter()
            .filter(|(_, text)| text.contains(title))
            .map(|(id, text)| Chunk::new(id.clone(), text.clone()))
            .collect()
    }

    /// Owned chunk by id
    pub fn chunk(&self, id: &ChunkId) -> Option<Chunk> {
        self.chunks
            .get(id)
            .map(|text| Chunk::new(id.clone(), text.clone()))
    }

    /// All chunks in registration order
    pub fn iter(&self) -> impl Iterator<Item = (&ChunkId, &str)> {
        self.chunks.iter().map(|(id, text)| (id, text.as_str()))
    }

    /// Number of registered chunks
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Whether no chunk is registered
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Number of documents with a recorded chunk list
    pub fn document_count(&self) -> usize {
        self.documents.len()
    }
}

impl Default for ChunkStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_assigns_unique_ids() {
        let mut store = ChunkStore::with_seed(42);
        let a = store.register("alpha").unwrap();
        let b = store.register("beta").unwrap();

        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), DEFAULT_ID_LENGTH);
        assert!(a
            .as_str()
            .bytes()
            .all(|byte| ID_ALPHABET.contains(&byte)));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_register_redraws_on_collision() {
        let first = ChunkStore::with_seed(7).register("x").unwrap();

        let mut store = ChunkStore::with_seed(7);
        store.insert(first.clone(), "already here").unwrap();
        let id = store.register("new").unwrap();

        assert_ne!(id, first);
        assert_eq!(store.get(&first), Some("already here"));
        assert_eq!(store.get(&id), Some("new"));
    }

    #[test]
    fn test_register_fails_loudly_when_exhausted() {
        let first = ChunkStore::with_seed(7).register("x").unwrap();

        let mut store = ChunkStore::with_seed(7);
        store.max_attempts = 1;
        store.insert(first, "already here").unwrap();

        let result = store.register("dropped");
        assert!(matches!(result, Err(StoreError::ChunkIdExhausted(1))));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_insert_rejects_duplicates() {
        let mut store = ChunkStore::new();
        store.insert(ChunkId::new("abc"), "one").unwrap();
        let result = store.insert(ChunkId::new("abc"), "two");
        assert!(matches!(result, Err(StoreError::DuplicateChunkId(_))));
        assert_eq!(store.get(&ChunkId::new("abc")), Some("one"));
    }

    #[test]
    fn test_index_is_authoritative() {
        let mut store = ChunkStore::new();
        let a = store.register("Report on AHU-1").unwrap();
        let b = store.register("Report on AHU-2").unwrap();
        store.record_document(3, vec![b.clone()]);

        let chunks = store.chunks_for_document(3, "Report");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].id, b);
        assert!(!store.chunks_for_document(3, "Report").iter().any(|c| c.id == a));
    }

    #[test]
    fn test_title_fallback() {
        let mut store = ChunkStore::new();
        store.register("Chiller CH-1 manual, page 1").unwrap();
        store.register("unrelated").unwrap();

        let chunks = store.chunks_for_document(9, "Chiller CH-1");
        assert_eq!(chunks.len(), 1);
        assert!(store.chunks_for_document(9, "  ").is_empty());
        assert!(store.chunks_for_document(9, "Boiler").is_empty());
    }

    #[test]
    fn test_record_document_ignores_unknown_ids() {
        let mut store = ChunkStore::new();
        let a = store.register("a").unwrap();
        store.record_document(0, vec![a.clone(), ChunkId::new("ghost")]);
        assert_eq!(store.document_chunk_ids(0), Some(&[a][..]));
        assert_eq!(store.document_count(), 1);
    }
}
