//! Vector index trait for storing and searching vector embeddings.

use async_trait::async_trait;

use crate::document::{IndexEntry, SearchResult};
use crate::error::{RagError, Result};

/// A storage backend for vector embeddings with cosine similarity search.
///
/// Every backend upholds the same contract:
///
/// - All stored vectors share one dimensionality `D`, fixed by the first
///   upsert (or by construction for remote indexes). Vectors of any other
///   length fail with [`RagError::DimensionMismatch`](crate::RagError::DimensionMismatch).
/// - `upsert` with an existing ID replaces vector and metadata as one unit;
///   readers never observe a half-updated entry.
/// - `query` returns at most `k` results ordered by descending score. An
///   empty index yields an empty result rather than an error.
/// - Vectors with a NaN or infinite component, stored or queried, fail with
///   [`RagError::InvalidArgument`](crate::RagError::InvalidArgument).
/// - `delete` of an unknown ID is a no-op.
///
/// # Example
///
/// ```rust,ignore
/// use ragkit::{InMemoryVectorIndex, IndexEntry, VectorIndex};
///
/// let index = InMemoryVectorIndex::new();
/// index.upsert(IndexEntry::new("a", vec![1.0, 0.0], Default::default())).await?;
/// let results = index.query(&[1.0, 0.1], 5).await?;
/// ```
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert an entry, replacing any existing entry with the same ID.
    async fn upsert(&self, entry: IndexEntry) -> Result<()>;

    /// Upsert several entries.
    ///
    /// Atomicity is per entry: if this fails part-way, earlier entries stay
    /// stored. The default implementation upserts sequentially.
    async fn upsert_batch(&self, entries: Vec<IndexEntry>) -> Result<()> {
        for entry in entries {
            self.upsert(entry).await?;
        }
        Ok(())
    }

    /// Return the `k` entries most similar to `vector`, best first.
    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<SearchResult>>;

    /// Remove the entry with the given ID if present.
    async fn delete(&self, id: &str) -> Result<()>;

    /// Remove every entry whose `parent_id` metadata equals `parent_id`.
    ///
    /// Backends that cannot filter on metadata return
    /// [`RagError::VectorStoreError`](crate::RagError::VectorStoreError).
    async fn delete_by_parent(&self, parent_id: &str) -> Result<()> {
        Err(RagError::VectorStoreError {
            backend: "vector_index".to_string(),
            message: format!("cannot delete entries of '{parent_id}' by metadata"),
        })
    }

    /// Number of stored entries.
    async fn len(&self) -> Result<usize>;

    /// Whether the index holds no entries.
    async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// The fixed dimensionality, or `None` before the first upsert.
    async fn dimensions(&self) -> Option<usize>;
}

/// Reject vectors with a NaN or infinite component; `label` names the vector in the error.
pub(crate) fn ensure_finite(label: &str, vector: &[f32]) -> Result<()> {
    match vector.iter().position(|x| !x.is_finite()) {
        Some(position) => Err(RagError::InvalidArgument(format!(
            "{label} has a non-finite component at position {position}"
        ))),
        None => Ok(()),
    }
}
