//! Data types for documents, chunks, index entries, and search results.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Metadata key holding a chunk's text inside an [`IndexEntry`].
pub const TEXT_KEY: &str = "text";
/// Metadata key holding the parent document ID inside an [`IndexEntry`].
pub const PARENT_ID_KEY: &str = "parent_id";
/// Metadata key holding the chunk sequence number inside an [`IndexEntry`].
pub const SEQUENCE_KEY: &str = "sequence";
/// Metadata key the chunkers add to every chunk.
pub const CHUNK_INDEX_KEY: &str = "chunk_index";

/// A source document containing text content and metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Unique identifier for the document.
    pub id: String,
    /// The text content of the document.
    pub text: String,
    /// Key-value metadata associated with the document.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    /// Optional URI pointing to the original source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_uri: Option<String>,
}

impl Document {
    /// Create a document with no metadata.
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self { id: id.into(), text: text.into(), metadata: HashMap::new(), source_uri: None }
    }

    /// Attach a metadata field.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// A contiguous, bounded-size slice of a [`Document`]'s text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// Deterministic identifier derived from the parent ID and sequence.
    pub id: String,
    /// The ID of the parent [`Document`].
    pub document_id: String,
    /// The text content of the chunk.
    pub text: String,
    /// Zero-based position of this chunk within its document.
    pub sequence: usize,
    /// Metadata inherited from the parent document plus chunk-specific fields.
    pub metadata: HashMap<String, String>,
}

/// The ID a chunk of `document_id` at position `sequence` is stored under.
///
/// Stable across runs so re-ingesting a document overwrites its chunks.
pub fn chunk_id(document_id: &str, sequence: usize) -> String {
    format!("{document_id}_{sequence}")
}

/// A stored vector with its key and metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexEntry {
    /// Unique key within the index.
    pub id: String,
    /// The embedding vector.
    pub vector: Vec<f32>,
    /// Arbitrary string metadata; ingestion stores the chunk text here.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl IndexEntry {
    /// Create an entry.
    pub fn new(id: impl Into<String>, vector: Vec<f32>, metadata: HashMap<String, String>) -> Self {
        Self { id: id.into(), vector, metadata }
    }

    /// Build the entry ingestion stores for `chunk`.
    pub fn from_chunk(chunk: &Chunk, vector: Vec<f32>) -> Self {
        let mut metadata = chunk.metadata.clone();
        metadata.insert(TEXT_KEY.to_string(), chunk.text.clone());
        metadata.insert(PARENT_ID_KEY.to_string(), chunk.document_id.clone());
        metadata.insert(SEQUENCE_KEY.to_string(), chunk.sequence.to_string());
        Self { id: chunk.id.clone(), vector, metadata }
    }

    /// The chunk text stored under [`TEXT_KEY`], if any.
    pub fn text(&self) -> Option<&str> {
        self.metadata.get(TEXT_KEY).map(String::as_str)
    }
}

/// A retrieved [`IndexEntry`] paired with its cosine similarity score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    /// The matched entry.
    pub entry: IndexEntry,
    /// Cosine similarity in `[-1, 1]`; higher is more relevant.
    pub score: f32,
}
