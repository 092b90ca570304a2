//! Error types for the `ragkit` crate.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur in RAG operations.
#[derive(Debug, Error)]
pub enum RagError {
    /// The caller supplied an argument outside the accepted domain.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A vector's length does not match the dimensionality fixed for the index.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// The dimensionality the index was fixed at.
        expected: usize,
        /// The length of the offending vector.
        actual: usize,
    },

    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred while generating an answer.
    #[error("Generation error ({provider}): {message}")]
    GenerationError {
        /// The generator that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// A vector index backend failed in a way that may succeed on retry.
    #[error("Transient error ({backend}): {message}")]
    TransientError {
        /// The vector index backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// A vector index backend failed permanently.
    #[error("Vector store error ({backend}): {message}")]
    VectorStoreError {
        /// The vector index backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// A single attempt at an external call exceeded its deadline.
    #[error("Timeout: {operation} did not complete within {after:?}")]
    Timeout {
        /// The operation that timed out.
        operation: String,
        /// The deadline that was exceeded.
        after: Duration,
    },

    /// Retrieval failed; wraps the underlying embedder or index failure.
    #[error("Retrieval error: {0}")]
    RetrievalError(#[source] Box<RagError>),

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl RagError {
    /// Whether a retry policy should attempt the failed call again.
    ///
    /// Provider failures, transient backend failures and timeouts are
    /// retryable. Caller and configuration errors are not, and neither is a
    /// [`RagError::RetrievalError`], which only ever wraps an exhausted chain.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RagError::EmbeddingError { .. }
                | RagError::GenerationError { .. }
                | RagError::TransientError { .. }
                | RagError::Timeout { .. }
        )
    }

    /// Wrap this error as a [`RagError::RetrievalError`].
    pub(crate) fn into_retrieval(self) -> RagError {
        match self {
            already @ RagError::RetrievalError(_) => already,
            other => RagError::RetrievalError(Box::new(other)),
        }
    }
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;
