//! Pinecone vector index backend.
//!
//! Provides [`PineconeIndex`] which implements [`VectorIndex`] over the
//! Pinecone data-plane REST API. The index must already exist with the
//! `cosine` metric; its dimensionality is supplied at construction and
//! enforced locally before any request is sent.
//!
//! This module is only available when the `pinecone` feature is enabled.
//!
//! # Example
//!
//! ```rust,ignore
//! use ragkit::pinecone::PineconeIndex;
//!
//! let index = PineconeIndex::new("https://docs-abc123.svc.pinecone.io", api_key, 1536)?;
//! index.upsert(entry).await?;
//! let results = index.query(&query_embedding, 5).await?;
//! ```

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::document::{IndexEntry, PARENT_ID_KEY, SearchResult};
use crate::error::{RagError, Result};
use crate::vectorstore::{VectorIndex, ensure_finite};

const BACKEND: &str = "pinecone";

/// Pinecone caps a single upsert request at 1000 vectors.
const MAX_UPSERT_BATCH: usize = 1000;

/// A [`VectorIndex`] backed by a [Pinecone](https://www.pinecone.io/) index.
///
/// Entries are stored as Pinecone vectors with their metadata as flat string
/// fields, optionally scoped to a namespace. Pinecone decides the order of
/// equally scored matches; the insertion-order tie-break of
/// [`InMemoryVectorIndex`](crate::InMemoryVectorIndex) is not reproduced.
pub struct PineconeIndex {
    client: reqwest::Client,
    host: String,
    api_key: String,
    namespace: Option<String>,
    dimensions: usize,
}

impl PineconeIndex {
    /// Connect to the index served at `host` (the index's data-plane URL).
    pub fn new(host: impl Into<String>, api_key: impl Into<String>, dimensions: usize) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(RagError::ConfigError("Pinecone API key must not be empty".to_string()));
        }
        if dimensions == 0 {
            return Err(RagError::ConfigError("Pinecone dimensions must be positive".to_string()));
        }
        let host = host.into();
        let host = if host.starts_with("http://") || host.starts_with("https://") {
            host
        } else {
            format!("https://{host}")
        };
        Ok(Self {
            client: reqwest::Client::new(),
            host: host.trim_end_matches('/').to_string(),
            api_key,
            namespace: None,
            dimensions,
        })
    }

    /// Connect using `PINECONE_INDEX_HOST` and `PINECONE_API_KEY`.
    pub fn from_env(dimensions: usize) -> Result<Self> {
        let var = |name: &str| {
            std::env::var(name)
                .map_err(|_| RagError::ConfigError(format!("{name} environment variable not set")))
        };
        Self::new(var("PINECONE_INDEX_HOST")?, var("PINECONE_API_KEY")?, dimensions)
    }

    /// Scope every operation to `namespace`.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    fn check_vector(&self, label: &str, vector: &[f32]) -> Result<()> {
        ensure_finite(label, vector)?;
        if vector.len() != self.dimensions {
            return Err(RagError::DimensionMismatch {
                expected: self.dimensions,
                actual: vector.len(),
            });
        }
        Ok(())
    }

    async fn post<Req, Resp>(&self, path: &str, body: &Req) -> Result<Resp>
    where
        Req: Serialize + ?Sized,
        Resp: for<'de> Deserialize<'de>,
    {
        let url = format!("{}{path}", self.host);
        debug!(backend = BACKEND, %url, "sending request");

        let response = self
            .client
            .post(&url)
            .header("Api-Key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| RagError::TransientError {
                backend: BACKEND.to_string(),
                message: format!("request to {path} failed: {e}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = format!("{path} returned {status}: {body}");
            return Err(if status.as_u16() == 429 || status.is_server_error() {
                RagError::TransientError { backend: BACKEND.to_string(), message }
            } else {
                RagError::VectorStoreError { backend: BACKEND.to_string(), message }
            });
        }

        response.json().await.map_err(|e| RagError::VectorStoreError {
            backend: BACKEND.to_string(),
            message: format!("failed to parse {path} response: {e}"),
        })
    }
}

// ── Pinecone API request/response types ────────────────────────────

#[derive(Serialize)]
struct UpsertRequest<'a> {
    vectors: Vec<PineconeVector<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Serialize)]
struct PineconeVector<'a> {
    id: &'a str,
    values: &'a [f32],
    metadata: &'a HashMap<String, String>,
}

#[derive(Serialize)]
struct QueryRequest<'a> {
    vector: &'a [f32],
    #[serde(rename = "topK")]
    top_k: usize,
    #[serde(rename = "includeValues")]
    include_values: bool,
    #[serde(rename = "includeMetadata")]
    include_metadata: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Deserialize)]
struct QueryMatch {
    id: String,
    score: f32,
    #[serde(default)]
    values: Vec<f32>,
    #[serde(default)]
    metadata: HashMap<String, serde_json::Value>,
}

#[derive(Serialize)]
struct DeleteRequest<'a> {
    ids: [&'a str; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Serialize)]
struct DeleteByFilterRequest<'a> {
    filter: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Serialize)]
struct StatsRequest {}

#[derive(Deserialize)]
struct StatsResponse {
    #[serde(default, rename = "totalVectorCount")]
    total_vector_count: usize,
    #[serde(default)]
    namespaces: HashMap<String, NamespaceStats>,
}

#[derive(Deserialize)]
struct NamespaceStats {
    #[serde(default, rename = "vectorCount")]
    vector_count: usize,
}

/// Pinecone returns metadata as JSON; non-string values are rendered as JSON text.
fn flatten_metadata(metadata: HashMap<String, serde_json::Value>) -> HashMap<String, String> {
    metadata
        .into_iter()
        .map(|(key, value)| match value {
            serde_json::Value::String(s) => (key, s),
            other => (key, other.to_string()),
        })
        .collect()
}

impl QueryMatch {
    fn into_result(self) -> SearchResult {
        SearchResult {
            entry: IndexEntry {
                id: self.id,
                vector: self.values,
                metadata: flatten_metadata(self.metadata),
            },
            score: self.score.clamp(-1.0, 1.0),
        }
    }
}

// ── VectorIndex implementation ─────────────────────────────────────

#[async_trait]
impl VectorIndex for PineconeIndex {
    async fn upsert(&self, entry: IndexEntry) -> Result<()> {
        self.upsert_batch(vec![entry]).await
    }

    async fn upsert_batch(&self, entries: Vec<IndexEntry>) -> Result<()> {
        for entry in &entries {
            self.check_vector(&format!("entry '{}'", entry.id), &entry.vector)?;
        }
        for batch in entries.chunks(MAX_UPSERT_BATCH) {
            let request = UpsertRequest {
                vectors: batch
                    .iter()
                    .map(|e| PineconeVector { id: &e.id, values: &e.vector, metadata: &e.metadata })
                    .collect(),
                namespace: self.namespace.as_deref(),
            };
            let _: serde_json::Value = self.post("/vectors/upsert", &request).await?;
            debug!(backend = BACKEND, count = batch.len(), "upserted vectors");
        }
        Ok(())
    }

    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        self.check_vector("query vector", vector)?;
        if k == 0 {
            return Ok(Vec::new());
        }
        let request = QueryRequest {
            vector,
            top_k: k,
            include_values: true,
            include_metadata: true,
            namespace: self.namespace.as_deref(),
        };
        let response: QueryResponse = self.post("/query", &request).await?;

        let mut results: Vec<SearchResult> =
            response.matches.into_iter().map(QueryMatch::into_result).collect();
        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results.truncate(k);
        Ok(results)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let request = DeleteRequest { ids: [id], namespace: self.namespace.as_deref() };
        let _: serde_json::Value = self.post("/vectors/delete", &request).await?;
        Ok(())
    }

    async fn delete_by_parent(&self, parent_id: &str) -> Result<()> {
        let request = DeleteByFilterRequest {
            filter: serde_json::json!({ PARENT_ID_KEY: { "$eq": parent_id } }),
            namespace: self.namespace.as_deref(),
        };
        let _: serde_json::Value = self.post("/vectors/delete", &request).await?;
        debug!(backend = BACKEND, parent_id, "deleted vectors by parent");
        Ok(())
    }

    async fn len(&self) -> Result<usize> {
        let stats: StatsResponse = self.post("/describe_index_stats", &StatsRequest {}).await?;
        Ok(match &self.namespace {
            Some(namespace) => stats.namespaces.get(namespace).map_or(0, |n| n.vector_count),
            None => stats.total_vector_count,
        })
    }

    async fn dimensions(&self) -> Option<usize> {
        Some(self.dimensions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_gets_scheme_and_loses_trailing_slash() {
        let index = PineconeIndex::new("docs-abc.svc.pinecone.io/", "key", 3).unwrap();
        assert_eq!(index.host, "https://docs-abc.svc.pinecone.io");
    }

    #[test]
    fn rejects_empty_key_and_zero_dimensions() {
        assert!(matches!(PineconeIndex::new("h", "", 3), Err(RagError::ConfigError(_))));
        assert!(matches!(PineconeIndex::new("h", "k", 0), Err(RagError::ConfigError(_))));
    }

    #[tokio::test]
    async fn dimension_mismatch_fails_before_any_request() {
        let index = PineconeIndex::new("http://127.0.0.1:9", "key", 3).unwrap();
        let err = index.query(&[1.0, 0.0], 2).await.unwrap_err();
        assert!(matches!(err, RagError::DimensionMismatch { expected: 3, actual: 2 }));
    }

    #[tokio::test]
    async fn non_finite_vectors_fail_before_any_request() {
        let index = PineconeIndex::new("http://127.0.0.1:9", "key", 2).unwrap();
        let err = index.query(&[f32::NAN, 0.0], 2).await.unwrap_err();
        assert!(matches!(err, RagError::InvalidArgument(_)));
        let entry = IndexEntry::new("a", vec![f32::INFINITY, 0.0], HashMap::new());
        assert!(matches!(index.upsert(entry).await, Err(RagError::InvalidArgument(_))));
    }

    #[test]
    fn delete_by_parent_filters_on_parent_id() {
        let request = DeleteByFilterRequest {
            filter: serde_json::json!({ PARENT_ID_KEY: { "$eq": "faq" } }),
            namespace: Some("support"),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["filter"]["parent_id"]["$eq"], "faq");
        assert_eq!(json["namespace"], "support");
    }

    #[test]
    fn query_request_uses_camel_case() {
        let request = QueryRequest {
            vector: &[0.5],
            top_k: 3,
            include_values: true,
            include_metadata: true,
            namespace: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["topK"], 3);
        assert_eq!(json["includeMetadata"], true);
        assert!(json.get("namespace").is_none());
    }

    #[test]
    fn match_metadata_is_flattened_to_strings() {
        let raw = r#"{"id":"doc_0","score":0.5,"metadata":{"text":"hi","sequence":0}}"#;
        let result = serde_json::from_str::<QueryMatch>(raw).unwrap().into_result();
        assert_eq!(result.entry.text(), Some("hi"));
        assert_eq!(result.entry.metadata["sequence"], "0");
        assert!(result.entry.vector.is_empty());
    }
}
