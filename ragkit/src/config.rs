//! Configuration for the RAG pipeline.

use serde::{Deserialize, Serialize};

use crate::document::TEXT_KEY;
use crate::error::{RagError, Result};
use crate::generation::DEFAULT_SYSTEM_PROMPT;

/// Configuration parameters for the RAG pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RagConfig {
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
    /// Number of overlapping characters between consecutive chunks.
    pub chunk_overlap: usize,
    /// Number of top results to return from vector search.
    pub top_k: usize,
    /// Minimum similarity score for results; `None` keeps every match.
    pub similarity_threshold: Option<f32>,
    /// How many documents `ingest_batch` embeds and stores at once.
    pub ingest_concurrency: usize,
    /// System prompt handed to the answer generator.
    pub system_prompt: String,
    /// Metadata field the retriever concatenates into the context string.
    pub content_field: String,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: 512,
            chunk_overlap: 100,
            top_k: 4,
            similarity_threshold: None,
            ingest_concurrency: 4,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            content_field: TEXT_KEY.to_string(),
        }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }

    /// Check that the parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if:
    /// - `chunk_size == 0`
    /// - `chunk_overlap >= chunk_size`
    /// - `top_k == 0`
    /// - `ingest_concurrency == 0`
    /// - `similarity_threshold` lies outside `[-1, 1]`
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(RagError::ConfigError("chunk_size must be greater than zero".to_string()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(RagError::ConfigError(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.top_k == 0 {
            return Err(RagError::ConfigError("top_k must be greater than zero".to_string()));
        }
        if self.ingest_concurrency == 0 {
            return Err(RagError::ConfigError(
                "ingest_concurrency must be greater than zero".to_string(),
            ));
        }
        if let Some(threshold) = self.similarity_threshold {
            if !(-1.0..=1.0).contains(&threshold) {
                return Err(RagError::ConfigError(format!(
                    "similarity_threshold ({threshold}) must lie within [-1, 1]"
                )));
            }
        }
        Ok(())
    }
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the maximum chunk size in characters.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the overlap between consecutive chunks in characters.
    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    /// Set the number of top results to return from vector search.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set the minimum similarity threshold for filtering results.
    pub fn similarity_threshold(mut self, threshold: f32) -> Self {
        self.config.similarity_threshold = Some(threshold);
        self
    }

    /// Set how many documents are ingested concurrently.
    pub fn ingest_concurrency(mut self, limit: usize) -> Self {
        self.config.ingest_concurrency = limit;
        self
    }

    /// Set the system prompt for answer generation.
    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = prompt.into();
        self
    }

    /// Set the metadata field used to build the context string.
    pub fn content_field(mut self, field: impl Into<String>) -> Self {
        self.config.content_field = field.into();
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] as described on [`RagConfig::validate`].
    pub fn build(self) -> Result<RagConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(RagConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_overlap_not_below_size() {
        let err = RagConfig::builder().chunk_size(50).chunk_overlap(50).build().unwrap_err();
        assert!(matches!(err, RagError::ConfigError(msg) if msg.contains("chunk_overlap")));
    }

    #[test]
    fn rejects_zero_top_k_and_concurrency() {
        assert!(RagConfig::builder().top_k(0).build().is_err());
        assert!(RagConfig::builder().ingest_concurrency(0).build().is_err());
    }

    #[test]
    fn rejects_threshold_outside_cosine_range() {
        assert!(RagConfig::builder().similarity_threshold(1.5).build().is_err());
        assert!(RagConfig::builder().similarity_threshold(-0.2).build().is_ok());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: RagConfig = serde_json::from_str(r#"{"chunk_size": 50, "chunk_overlap": 0}"#)
            .unwrap();
        assert_eq!(config.chunk_size, 50);
        assert_eq!(config.top_k, 4);
        assert_eq!(config.content_field, "text");
    }
}
