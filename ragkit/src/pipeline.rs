//! RAG pipeline orchestrator.
//!
//! The [`RagPipeline`] coordinates the full ingest-and-answer workflow by
//! composing an [`EmbeddingProvider`], a [`VectorIndex`], a [`Chunker`],
//! a [`Retriever`], and an optional [`AnswerGenerator`].
//!
//! # Example
//!
//! ```rust,ignore
//! use ragkit::{RagPipeline, RagConfig, InMemoryVectorIndex};
//!
//! let pipeline = RagPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(my_embedder))
//!     .vector_index(Arc::new(InMemoryVectorIndex::new()))
//!     .answer_generator(Arc::new(my_chat_model))
//!     .build()?;
//!
//! pipeline.ingest(&document).await?;
//! let answer = pipeline.answer("what is the return window?", 3).await?;
//! ```
//!
//! Dropping an `ingest_*` or `answer` future cancels it. Entries upserted
//! before cancellation stay in the index; only single entries are atomic.

use std::sync::Arc;

use futures::{StreamExt, TryStreamExt, stream};
use serde::Serialize;
use tracing::{error, info};

use crate::chunking::{Chunker, RecursiveChunker};
use crate::config::RagConfig;
use crate::document::{Chunk, Document, IndexEntry, SearchResult, chunk_id};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::generation::AnswerGenerator;
use crate::retriever::Retriever;
use crate::retry::RetryPolicy;
use crate::vectorstore::VectorIndex;

/// An answer together with the material it was generated from.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    /// The generator's reply, verbatim.
    pub text: String,
    /// The context string handed to the generator.
    pub context: String,
    /// The matches the context was built from, best first.
    pub sources: Vec<SearchResult>,
}

/// The RAG pipeline orchestrator.
///
/// Coordinates document ingestion (chunk → embed → upsert) and question
/// answering (embed → search → format context → generate). Construct one via
/// [`RagPipeline::builder()`].
pub struct RagPipeline {
    config: RagConfig,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    vector_index: Arc<dyn VectorIndex>,
    chunker: Arc<dyn Chunker>,
    answer_generator: Option<Arc<dyn AnswerGenerator>>,
    retry: RetryPolicy,
    retriever: Retriever,
}

impl RagPipeline {
    /// Create a new [`RagPipelineBuilder`].
    pub fn builder() -> RagPipelineBuilder {
        RagPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Return a reference to the embedding provider.
    pub fn embedding_provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedding_provider
    }

    /// Return a reference to the vector index.
    pub fn vector_index(&self) -> &Arc<dyn VectorIndex> {
        &self.vector_index
    }

    /// Return a reference to the retriever used on the query path.
    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    /// Ingest a single document with the configured chunker: chunk → embed → upsert.
    ///
    /// Chunk IDs derive from the document ID and chunk sequence, so ingesting
    /// the same document again with the same parameters overwrites its
    /// entries instead of duplicating them. Returns the stored chunks.
    ///
    /// A re-ingest that yields fewer chunks leaves the old tail
    /// (`{id}_{n}` onwards) in place; call
    /// [`purge_document`](Self::purge_document) first when a document shrinks.
    ///
    /// # Errors
    ///
    /// Returns the chunker's [`RagError::InvalidArgument`], or the embedding or
    /// index error that survived the retry policy, unchanged.
    pub async fn ingest(&self, document: &Document) -> Result<Vec<Chunk>> {
        self.ingest_chunked(document, self.chunker.as_ref()).await
    }

    /// Ingest multiple documents with the configured chunker.
    ///
    /// Up to `ingest_concurrency` documents are processed at once. Returned
    /// chunks follow document order.
    ///
    /// # Errors
    ///
    /// Returns the first failure; documents still in flight are cancelled and
    /// whatever they already stored remains in the index.
    pub async fn ingest_batch(&self, documents: &[Document]) -> Result<Vec<Chunk>> {
        self.ingest_all(documents, self.chunker.as_ref()).await
    }

    /// Ingest documents split with explicit chunking parameters.
    ///
    /// Uses a [`RecursiveChunker`] with `max_chunk_size` and `overlap` in place
    /// of the configured chunker.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidArgument`] if `overlap >= max_chunk_size` or
    /// `max_chunk_size == 0`, otherwise as [`ingest_batch`](Self::ingest_batch).
    pub async fn ingest_with(
        &self,
        documents: &[Document],
        max_chunk_size: usize,
        overlap: usize,
    ) -> Result<Vec<Chunk>> {
        let chunker = RecursiveChunker::new(max_chunk_size, overlap);
        self.ingest_all(documents, &chunker).await
    }

    async fn ingest_all(&self, documents: &[Document], chunker: &dyn Chunker) -> Result<Vec<Chunk>> {
        let per_document: Vec<Vec<Chunk>> = stream::iter(documents)
            .map(|document| self.ingest_chunked(document, chunker))
            .buffered(self.config.ingest_concurrency)
            .try_collect()
            .await?;

        let chunks: Vec<Chunk> = per_document.into_iter().flatten().collect();
        info!(document_count = documents.len(), chunk_count = chunks.len(), "ingested batch");
        Ok(chunks)
    }

    async fn ingest_chunked(&self, document: &Document, chunker: &dyn Chunker) -> Result<Vec<Chunk>> {
        // 1. Chunk the document
        let chunks = chunker.chunk(document).map_err(|e| {
            error!(document.id = %document.id, error = %e, "chunking failed");
            e
        })?;
        if chunks.is_empty() {
            info!(document.id = %document.id, chunk_count = 0, "ingested document (empty)");
            return Ok(chunks);
        }

        // 2. Generate embeddings
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let embeddings = self
            .retry
            .run("embed chunks", || self.embedding_provider.embed_batch(&texts))
            .await
            .map_err(|e| {
                error!(document.id = %document.id, error = %e, "embedding failed during ingestion");
                e
            })?;
        if embeddings.len() != chunks.len() {
            return Err(RagError::EmbeddingError {
                provider: "pipeline".to_string(),
                message: format!(
                    "expected {} embeddings for document '{}', got {}",
                    chunks.len(),
                    document.id,
                    embeddings.len()
                ),
            });
        }

        // 3. Upsert into the index
        let entries: Vec<IndexEntry> = chunks
            .iter()
            .zip(embeddings)
            .map(|(chunk, vector)| IndexEntry::from_chunk(chunk, vector))
            .collect();
        self.retry
            .run("upsert chunks", || self.vector_index.upsert_batch(entries.clone()))
            .await
            .map_err(|e| {
                error!(document.id = %document.id, error = %e, "upsert failed during ingestion");
                e
            })?;

        info!(document.id = %document.id, chunk_count = chunks.len(), "ingested document");
        Ok(chunks)
    }

    /// Remove the first `chunk_count` chunks stored for `document_id`.
    ///
    /// # Errors
    ///
    /// Returns the index error that survived the retry policy.
    pub async fn delete_document(&self, document_id: &str, chunk_count: usize) -> Result<()> {
        for sequence in 0..chunk_count {
            let id = chunk_id(document_id, sequence);
            self.retry.run("delete chunk", || self.vector_index.delete(&id)).await?;
        }
        info!(document.id = %document_id, chunk_count, "deleted document");
        Ok(())
    }

    /// Remove every chunk stored for `document_id`, however many there are.
    ///
    /// Matches on the `parent_id` metadata written at ingestion.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::VectorStoreError`] if the index cannot filter on
    /// metadata, or the index error that survived the retry policy.
    pub async fn purge_document(&self, document_id: &str) -> Result<()> {
        self.retry
            .run("purge document", || self.vector_index.delete_by_parent(document_id))
            .await?;
        info!(document.id = %document_id, "purged document");
        Ok(())
    }

    /// Search for the configured `top_k` matches to `question`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::RetrievalError`] if embedding or search fails.
    pub async fn query(&self, question: &str) -> Result<Vec<SearchResult>> {
        let results = self.retriever.search(question, self.config.top_k).await?;
        info!(result_count = results.len(), "query completed");
        Ok(results)
    }

    /// Build the context string for `question` from the top `k` matches.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::RetrievalError`] if embedding or search fails.
    pub async fn retrieve(&self, question: &str, k: usize) -> Result<String> {
        self.retriever.retrieve(question, k).await
    }

    /// Answer `question` from the top `k` matches.
    ///
    /// The generator's reply is returned verbatim.
    ///
    /// # Errors
    ///
    /// - [`RagError::ConfigError`] if no answer generator is configured
    /// - [`RagError::RetrievalError`] if retrieval fails
    /// - [`RagError::GenerationError`] carrying the last failure once the
    ///   retry policy is exhausted
    pub async fn answer(&self, question: &str, k: usize) -> Result<String> {
        Ok(self.ask(question, k).await?.text)
    }

    /// Like [`answer`](Self::answer), but also returns the context and matches used.
    ///
    /// # Errors
    ///
    /// As [`answer`](Self::answer).
    pub async fn ask(&self, question: &str, k: usize) -> Result<Answer> {
        let generator = self.answer_generator.as_ref().ok_or_else(|| {
            RagError::ConfigError("answer_generator is required to answer questions".to_string())
        })?;

        let sources = self.retriever.search(question, k).await?;
        let context = self.retriever.format_context(&sources);

        let text = self
            .retry
            .run("generate answer", || {
                generator.generate(&self.config.system_prompt, &context, question)
            })
            .await
            .map_err(|e| {
                error!(error = %e, "answer generation failed");
                as_generation_error(e)
            })?;

        info!(source_count = sources.len(), answer_len = text.len(), "answered question");
        Ok(Answer { text, context, sources })
    }
}

/// A generator failure that is not already a `GenerationError` (a timeout,
/// say) is reported as one, keeping the underlying message.
fn as_generation_error(err: RagError) -> RagError {
    match err {
        generation @ RagError::GenerationError { .. } => generation,
        other => RagError::GenerationError {
            provider: "answer_generator".to_string(),
            message: other.to_string(),
        },
    }
}

/// Builder for constructing a [`RagPipeline`].
///
/// `config`, `embedding_provider` and `vector_index` are required. The
/// chunker defaults to a [`RecursiveChunker`] over the configured sizes and
/// the retry policy to [`RetryPolicy::default()`]. The answer generator is
/// only needed for [`RagPipeline::answer`].
///
/// # Example
///
/// ```rust,ignore
/// let pipeline = RagPipeline::builder()
///     .config(RagConfig::default())
///     .embedding_provider(Arc::new(embedder))
///     .vector_index(Arc::new(index))
///     .chunker(Arc::new(FixedSizeChunker::new(256, 32)))  // optional
///     .answer_generator(Arc::new(generator))              // optional
///     .build()?;
/// ```
#[derive(Default)]
pub struct RagPipelineBuilder {
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    vector_index: Option<Arc<dyn VectorIndex>>,
    chunker: Option<Arc<dyn Chunker>>,
    answer_generator: Option<Arc<dyn AnswerGenerator>>,
    retry: Option<RetryPolicy>,
}

impl RagPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the vector index backend.
    pub fn vector_index(mut self, index: Arc<dyn VectorIndex>) -> Self {
        self.vector_index = Some(index);
        self
    }

    /// Set the document chunker.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Set the answer generator.
    pub fn answer_generator(mut self, generator: Arc<dyn AnswerGenerator>) -> Self {
        self.answer_generator = Some(generator);
        self
    }

    /// Set the retry policy applied to every external call.
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy);
        self
    }

    /// Build the [`RagPipeline`], validating that all required fields are set.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if a required field is missing or the
    /// configuration is invalid.
    pub fn build(self) -> Result<RagPipeline> {
        let config =
            self.config.ok_or_else(|| RagError::ConfigError("config is required".to_string()))?;
        config.validate()?;
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::ConfigError("embedding_provider is required".to_string()))?;
        let vector_index = self
            .vector_index
            .ok_or_else(|| RagError::ConfigError("vector_index is required".to_string()))?;
        let chunker = self.chunker.unwrap_or_else(|| {
            Arc::new(RecursiveChunker::new(config.chunk_size, config.chunk_overlap))
        });
        let retry = self.retry.unwrap_or_default();

        let retriever = Retriever::new(embedding_provider.clone(), vector_index.clone(), retry)
            .with_content_field(config.content_field.clone())
            .with_similarity_threshold(config.similarity_threshold);

        Ok(RagPipeline {
            config,
            embedding_provider,
            vector_index,
            chunker,
            answer_generator: self.answer_generator,
            retry,
            retriever,
        })
    }
}
