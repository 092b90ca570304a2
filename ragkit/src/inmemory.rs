//! In-memory vector index using cosine similarity.
//!
//! This module provides [`InMemoryVectorIndex`], a flat (exhaustive) index
//! backed by a `HashMap` protected by a `tokio::sync::RwLock`. Queries are
//! `O(n·D)`, which suits the few-thousand-entry scale this crate targets.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::document::{IndexEntry, PARENT_ID_KEY, SearchResult};
use crate::error::{RagError, Result};
use crate::similarity::cosine_similarity;
use crate::vectorstore::{VectorIndex, ensure_finite};

#[derive(Debug)]
struct Slot {
    entry: IndexEntry,
    /// Insertion sequence of the ID; breaks score ties, earlier first.
    inserted: u64,
}

#[derive(Debug, Default)]
struct IndexState {
    dimensions: Option<usize>,
    slots: HashMap<String, Slot>,
    next_sequence: u64,
}

impl IndexState {
    fn put(&mut self, entry: IndexEntry) -> Result<()> {
        if entry.vector.is_empty() {
            return Err(RagError::InvalidArgument(format!(
                "entry '{}' has an empty vector",
                entry.id
            )));
        }
        ensure_finite(&format!("entry '{}'", entry.id), &entry.vector)?;
        match self.dimensions {
            Some(expected) if expected != entry.vector.len() => {
                return Err(RagError::DimensionMismatch { expected, actual: entry.vector.len() });
            }
            Some(_) => {}
            None => self.dimensions = Some(entry.vector.len()),
        }

        let inserted = match self.slots.get(&entry.id) {
            Some(existing) => existing.inserted,
            None => {
                let sequence = self.next_sequence;
                self.next_sequence += 1;
                sequence
            }
        };
        self.slots.insert(entry.id.clone(), Slot { entry, inserted });
        Ok(())
    }
}

/// An in-memory vector index using cosine similarity for search.
///
/// Readers share the lock, so concurrent queries never block each other; an
/// upsert holds it exclusively and swaps the whole entry in one step.
/// Replacing an existing ID keeps the ID's original position for tie-breaking.
///
/// # Example
///
/// ```rust,ignore
/// use ragkit::{InMemoryVectorIndex, VectorIndex};
///
/// let index = InMemoryVectorIndex::new();
/// index.upsert(entry).await?;
/// let top = index.query(&query_vector, 3).await?;
/// ```
#[derive(Debug, Default)]
pub struct InMemoryVectorIndex {
    state: RwLock<IndexState>,
}

impl InMemoryVectorIndex {
    /// Create a new empty index; its dimensionality is fixed by the first upsert.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty index that only accepts vectors of length `dimensions`.
    pub fn with_dimensions(dimensions: usize) -> Self {
        Self {
            state: RwLock::new(IndexState { dimensions: Some(dimensions), ..Default::default() }),
        }
    }

    /// Fetch a stored entry by ID.
    pub async fn get(&self, id: &str) -> Option<IndexEntry> {
        self.state.read().await.slots.get(id).map(|slot| slot.entry.clone())
    }

    /// Tear the index down: drop every entry and forget the dimensionality.
    pub async fn clear(&self) {
        *self.state.write().await = IndexState::default();
    }
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    async fn upsert(&self, entry: IndexEntry) -> Result<()> {
        self.state.write().await.put(entry)
    }

    async fn upsert_batch(&self, entries: Vec<IndexEntry>) -> Result<()> {
        let mut state = self.state.write().await;
        for entry in entries {
            state.put(entry)?;
        }
        Ok(())
    }

    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        ensure_finite("query vector", vector)?;
        let state = self.state.read().await;
        if k == 0 || state.slots.is_empty() {
            return Ok(Vec::new());
        }
        match state.dimensions {
            Some(expected) if expected != vector.len() => {
                return Err(RagError::DimensionMismatch { expected, actual: vector.len() });
            }
            _ => {}
        }

        let mut scored: Vec<(f32, u64, &IndexEntry)> = state
            .slots
            .values()
            .map(|slot| (cosine_similarity(&slot.entry.vector, vector), slot.inserted, &slot.entry))
            .collect();

        scored.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(score, _, entry)| SearchResult { entry: entry.clone(), score })
            .collect())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.state.write().await.slots.remove(id);
        Ok(())
    }

    async fn delete_by_parent(&self, parent_id: &str) -> Result<()> {
        self.state.write().await.slots.retain(|_, slot| {
            slot.entry.metadata.get(PARENT_ID_KEY).map(String::as_str) != Some(parent_id)
        });
        Ok(())
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.state.read().await.slots.len())
    }

    async fn dimensions(&self) -> Option<usize> {
        self.state.read().await.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, vector: Vec<f32>) -> IndexEntry {
        IndexEntry::new(id, vector, HashMap::from([("text".to_string(), id.to_string())]))
    }

    #[tokio::test]
    async fn empty_index_query_is_empty() {
        let index = InMemoryVectorIndex::new();
        assert!(index.query(&[1.0, 0.0], 3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn first_upsert_fixes_dimensions() {
        let index = InMemoryVectorIndex::new();
        index.upsert(entry("a", vec![1.0, 0.0, 0.0])).await.unwrap();
        assert_eq!(index.dimensions().await, Some(3));

        let err = index.upsert(entry("b", vec![1.0, 0.0])).await.unwrap_err();
        assert!(matches!(err, RagError::DimensionMismatch { expected: 3, actual: 2 }));

        let err = index.query(&[1.0], 1).await.unwrap_err();
        assert!(matches!(err, RagError::DimensionMismatch { expected: 3, actual: 1 }));
    }

    #[tokio::test]
    async fn preset_dimensions_reject_first_upsert() {
        let index = InMemoryVectorIndex::with_dimensions(4);
        let err = index.upsert(entry("a", vec![1.0])).await.unwrap_err();
        assert!(matches!(err, RagError::DimensionMismatch { expected: 4, actual: 1 }));
    }

    #[tokio::test]
    async fn empty_vector_is_invalid() {
        let index = InMemoryVectorIndex::new();
        let err = index.upsert(entry("a", Vec::new())).await.unwrap_err();
        assert!(matches!(err, RagError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn non_finite_vectors_are_rejected() {
        let index = InMemoryVectorIndex::new();
        index.upsert(entry("good", vec![1.0, 0.0])).await.unwrap();

        for bad in [vec![f32::NAN, 0.0], vec![f32::INFINITY, 1.0], vec![0.0, f32::NEG_INFINITY]] {
            let err = index.upsert(entry("bad", bad.clone())).await.unwrap_err();
            assert!(matches!(err, RagError::InvalidArgument(_)));
            let err = index.query(&bad, 3).await.unwrap_err();
            assert!(matches!(err, RagError::InvalidArgument(_)));
        }

        assert_eq!(index.len().await.unwrap(), 1);
        let results = index.query(&[1.0, 0.0], 3).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].entry.id, "good");
        assert!((results[0].score - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn delete_by_parent_removes_every_chunk_of_a_document() {
        let index = InMemoryVectorIndex::new();
        for (id, parent) in [("faq_0", "faq"), ("faq_1", "faq"), ("faq_7", "faq"), ("tos_0", "tos")] {
            let mut e = entry(id, vec![1.0, 0.0]);
            e.metadata.insert(PARENT_ID_KEY.to_string(), parent.to_string());
            index.upsert(e).await.unwrap();
        }

        index.delete_by_parent("faq").await.unwrap();
        assert_eq!(index.len().await.unwrap(), 1);
        assert!(index.get("tos_0").await.is_some());
    }

    #[tokio::test]
    async fn upsert_replaces_existing_id() {
        let index = InMemoryVectorIndex::new();
        index.upsert(entry("a", vec![1.0, 0.0])).await.unwrap();
        let mut replacement = entry("a", vec![0.0, 1.0]);
        replacement.metadata.insert("text".into(), "replaced".into());
        index.upsert(replacement).await.unwrap();

        assert_eq!(index.len().await.unwrap(), 1);
        let stored = index.get("a").await.unwrap();
        assert_eq!(stored.vector, vec![0.0, 1.0]);
        assert_eq!(stored.text(), Some("replaced"));
    }

    #[tokio::test]
    async fn ties_break_by_insertion_order() {
        let index = InMemoryVectorIndex::new();
        for id in ["first", "second", "third"] {
            index.upsert(entry(id, vec![1.0, 1.0])).await.unwrap();
        }
        // Replacing keeps "first" at the front of the tie.
        index.upsert(entry("first", vec![2.0, 2.0])).await.unwrap();

        let results = index.query(&[1.0, 1.0], 2).await.unwrap();
        let ids: Vec<&str> = results.iter().map(|r| r.entry.id.as_str()).collect();
        assert_eq!(ids, ["first", "second"]);
    }

    #[tokio::test]
    async fn delete_then_reinsert_moves_to_back() {
        let index = InMemoryVectorIndex::new();
        index.upsert(entry("a", vec![1.0, 0.0])).await.unwrap();
        index.upsert(entry("b", vec![1.0, 0.0])).await.unwrap();
        index.delete("a").await.unwrap();
        index.delete("missing").await.unwrap();
        index.upsert(entry("a", vec![1.0, 0.0])).await.unwrap();

        let results = index.query(&[1.0, 0.0], 2).await.unwrap();
        assert_eq!(results[0].entry.id, "b");
        assert_eq!(results[1].entry.id, "a");
    }

    #[tokio::test]
    async fn query_ranks_by_cosine() {
        let index = InMemoryVectorIndex::new();
        index.upsert(entry("east", vec![1.0, 0.0])).await.unwrap();
        index.upsert(entry("north", vec![0.0, 1.0])).await.unwrap();
        index.upsert(entry("west", vec![-1.0, 0.0])).await.unwrap();

        let results = index.query(&[0.9, 0.1], 3).await.unwrap();
        let ids: Vec<&str> = results.iter().map(|r| r.entry.id.as_str()).collect();
        assert_eq!(ids, ["east", "north", "west"]);
        assert!(results[2].score < 0.0);
    }

    #[tokio::test]
    async fn clear_forgets_dimensions() {
        let index = InMemoryVectorIndex::new();
        index.upsert(entry("a", vec![1.0, 0.0])).await.unwrap();
        index.clear().await;
        assert_eq!(index.dimensions().await, None);
        index.upsert(entry("a", vec![1.0, 0.0, 0.0])).await.unwrap();
        assert_eq!(index.len().await.unwrap(), 1);
    }
}
