//! # ragkit
//!
//! Retrieval-augmented generation building blocks.
//!
//! The crate is organised around two paths through a [`RagPipeline`]:
//!
//! - **Ingestion**: a [`Chunker`] splits each [`Document`] into overlapping
//!   [`Chunk`]s, an [`EmbeddingProvider`] turns each chunk into a vector, and a
//!   [`VectorIndex`] stores it under a deterministic ID.
//! - **Answering**: the [`Retriever`] embeds the question, takes the top-k
//!   matches by cosine similarity, and joins their text into a context string
//!   that an [`AnswerGenerator`] answers from.
//!
//! External collaborators are traits passed in at construction; every call
//! that crosses one runs under an explicit [`RetryPolicy`].
//!
//! ## Feature flags
//!
//! | Feature | Adds |
//! |---|---|
//! | `openai` | [`openai::OpenAIEmbeddingProvider`], [`openai::OpenAIChatGenerator`] (OpenAI and Azure OpenAI) |
//! | `pinecone` | [`pinecone::PineconeIndex`] |
//! | `full` | all of the above |
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ragkit::{Document, InMemoryVectorIndex, RagConfig, RagPipeline};
//!
//! let pipeline = RagPipeline::builder()
//!     .config(RagConfig::builder().chunk_size(256).chunk_overlap(32).build()?)
//!     .embedding_provider(Arc::new(embedder))
//!     .vector_index(Arc::new(InMemoryVectorIndex::new()))
//!     .answer_generator(Arc::new(generator))
//!     .build()?;
//!
//! pipeline.ingest(&Document::new("returns", "Groceries can be returned within 90 days.")).await?;
//! let answer = pipeline.answer("Can I return groceries?", 3).await?;
//! ```

pub mod chunking;
pub mod classify;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod inmemory;
pub mod pipeline;
pub mod retriever;
pub mod retry;
pub mod similarity;
pub mod vectorstore;

#[cfg(feature = "openai")]
pub mod openai;
#[cfg(feature = "pinecone")]
pub mod pinecone;

pub use chunking::{Chunker, FixedSizeChunker, RecursiveChunker, split};
pub use config::{RagConfig, RagConfigBuilder};
pub use document::{Chunk, Document, IndexEntry, SearchResult};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
pub use generation::{AnswerGenerator, DEFAULT_SYSTEM_PROMPT};
pub use inmemory::InMemoryVectorIndex;
pub use pipeline::{Answer, RagPipeline, RagPipelineBuilder};
pub use retriever::Retriever;
pub use retry::RetryPolicy;
pub use similarity::cosine_similarity;
pub use vectorstore::VectorIndex;
