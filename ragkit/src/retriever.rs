//! Turns a question into a context string drawn from the vector index.

use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::document::{SearchResult, TEXT_KEY};
use crate::embedding::EmbeddingProvider;
use crate::error::Result;
use crate::retry::RetryPolicy;
use crate::vectorstore::VectorIndex;

/// Separator placed between retrieved passages.
pub const CONTEXT_SEPARATOR: &str = "\n\n";

/// Embeds a question, searches the index, and formats the hits as context.
///
/// Both external calls run under the retriever's [`RetryPolicy`]. Any failure
/// that survives the policy is surfaced as
/// [`RagError::RetrievalError`](crate::RagError::RetrievalError); an empty
/// context is only ever returned when the index genuinely has no matches.
///
/// # Example
///
/// ```rust,ignore
/// use ragkit::{Retriever, RetryPolicy};
///
/// let retriever = Retriever::new(embedder, index, RetryPolicy::default());
/// let context = retriever.retrieve("is a dog a mammal?", 2).await?;
/// ```
#[derive(Clone)]
pub struct Retriever {
    embedding_provider: Arc<dyn EmbeddingProvider>,
    vector_index: Arc<dyn VectorIndex>,
    retry: RetryPolicy,
    content_field: String,
    similarity_threshold: Option<f32>,
}

impl Retriever {
    /// Create a retriever reading the `text` metadata field of each match.
    pub fn new(
        embedding_provider: Arc<dyn EmbeddingProvider>,
        vector_index: Arc<dyn VectorIndex>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            embedding_provider,
            vector_index,
            retry,
            content_field: TEXT_KEY.to_string(),
            similarity_threshold: None,
        }
    }

    /// Read passages from `field` instead of `text`.
    pub fn with_content_field(mut self, field: impl Into<String>) -> Self {
        self.content_field = field.into();
        self
    }

    /// Drop matches scoring below `threshold`.
    pub fn with_similarity_threshold(mut self, threshold: Option<f32>) -> Self {
        self.similarity_threshold = threshold;
        self
    }

    /// Return up to `k` matches for `question`, best first.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::RetrievalError`](crate::RagError::RetrievalError)
    /// wrapping the embedder or index failure.
    pub async fn search(&self, question: &str, k: usize) -> Result<Vec<SearchResult>> {
        let query_embedding = self
            .retry
            .run("embed query", || self.embedding_provider.embed(question))
            .await
            .map_err(|e| {
                error!(error = %e, "embedding failed during retrieval");
                e.into_retrieval()
            })?;

        let results = self
            .retry
            .run("query index", || self.vector_index.query(&query_embedding, k))
            .await
            .map_err(|e| {
                error!(k, error = %e, "vector index query failed");
                e.into_retrieval()
            })?;

        let results: Vec<SearchResult> = match self.similarity_threshold {
            Some(threshold) => results.into_iter().filter(|r| r.score >= threshold).collect(),
            None => results,
        };

        debug!(k, result_count = results.len(), "retrieval completed");
        Ok(results)
    }

    /// Retrieve the context string for `question`: the content field of each
    /// of the top `k` matches, best first, separated by a blank line.
    ///
    /// Matches missing the content field are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::RetrievalError`](crate::RagError::RetrievalError)
    /// wrapping the embedder or index failure.
    pub async fn retrieve(&self, question: &str, k: usize) -> Result<String> {
        let results = self.search(question, k).await?;
        Ok(self.format_context(&results))
    }

    /// Join the content field of `results` in the given order.
    pub fn format_context(&self, results: &[SearchResult]) -> String {
        let passages: Vec<&str> = results
            .iter()
            .filter_map(|r| {
                let passage = r.entry.metadata.get(&self.content_field).map(String::as_str);
                if passage.is_none() {
                    warn!(
                        entry.id = %r.entry.id,
                        field = %self.content_field,
                        "match has no content field, skipping"
                    );
                }
                passage
            })
            .collect();
        passages.join(CONTEXT_SEPARATOR)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::document::IndexEntry;
    use crate::error::RagError;
    use crate::inmemory::InMemoryVectorIndex;

    struct FixedEmbedder(Vec<f32>);

    #[async_trait]
    impl EmbeddingProvider for FixedEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(self.0.clone())
        }

        fn dimensions(&self) -> usize {
            self.0.len()
        }
    }

    struct BrokenEmbedder(AtomicU32);

    #[async_trait]
    impl EmbeddingProvider for BrokenEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Err(RagError::EmbeddingError { provider: "broken".into(), message: "down".into() })
        }

        fn dimensions(&self) -> usize {
            2
        }
    }

    async fn seeded_index() -> Arc<InMemoryVectorIndex> {
        let index = Arc::new(InMemoryVectorIndex::new());
        let rows = [("a", vec![1.0, 0.0], "alpha"), ("b", vec![0.7, 0.7], "beta")];
        for (id, vector, text) in rows {
            let metadata = HashMap::from([
                ("text".to_string(), text.to_string()),
                ("title".to_string(), text.to_uppercase()),
            ]);
            index.upsert(IndexEntry::new(id, vector, metadata)).await.unwrap();
        }
        index
    }

    #[tokio::test]
    async fn joins_passages_best_first() {
        let retriever = Retriever::new(
            Arc::new(FixedEmbedder(vec![1.0, 0.1])),
            seeded_index().await,
            RetryPolicy::none(),
        );
        assert_eq!(retriever.retrieve("q", 2).await.unwrap(), "alpha\n\nbeta");
    }

    #[tokio::test]
    async fn reads_designated_field() {
        let retriever = Retriever::new(
            Arc::new(FixedEmbedder(vec![0.0, 1.0])),
            seeded_index().await,
            RetryPolicy::none(),
        )
        .with_content_field("title");
        assert_eq!(retriever.retrieve("q", 1).await.unwrap(), "BETA");
    }

    #[tokio::test]
    async fn threshold_filters_weak_matches() {
        let retriever = Retriever::new(
            Arc::new(FixedEmbedder(vec![0.0, 1.0])),
            seeded_index().await,
            RetryPolicy::none(),
        )
        .with_similarity_threshold(Some(0.5));
        assert_eq!(retriever.retrieve("q", 2).await.unwrap(), "beta");
    }

    #[tokio::test]
    async fn empty_index_gives_empty_context() {
        let retriever = Retriever::new(
            Arc::new(FixedEmbedder(vec![1.0, 0.0])),
            Arc::new(InMemoryVectorIndex::new()),
            RetryPolicy::none(),
        );
        assert_eq!(retriever.retrieve("q", 3).await.unwrap(), "");
    }

    #[tokio::test(start_paused = true)]
    async fn embedder_failure_is_wrapped_after_retries() {
        let embedder = Arc::new(BrokenEmbedder(AtomicU32::new(0)));
        let retriever = Retriever::new(
            embedder.clone(),
            seeded_index().await,
            RetryPolicy::default().with_max_attempts(3),
        );
        let err = retriever.retrieve("q", 2).await.unwrap_err();
        assert!(matches!(
            err,
            RagError::RetrievalError(ref inner) if matches!(**inner, RagError::EmbeddingError { .. })
        ));
        assert_eq!(embedder.0.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn dimension_mismatch_is_wrapped() {
        let retriever = Retriever::new(
            Arc::new(FixedEmbedder(vec![1.0, 0.0, 0.0])),
            seeded_index().await,
            RetryPolicy::default(),
        );
        let err = retriever.retrieve("q", 2).await.unwrap_err();
        assert!(matches!(
            err,
            RagError::RetrievalError(ref inner)
                if matches!(**inner, RagError::DimensionMismatch { expected: 2, actual: 3 })
        ));
    }
}
