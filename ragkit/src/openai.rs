//! OpenAI and Azure OpenAI providers for embeddings and chat completions.
//!
//! This module is only available when the `openai` feature is enabled.
//!
//! - [`OpenAIEmbeddingProvider`] implements [`EmbeddingProvider`] over `/embeddings`.
//! - [`OpenAIChatGenerator`] implements [`AnswerGenerator`] over `/chat/completions`.
//!
//! Both talk either to the public OpenAI API or to an Azure OpenAI deployment;
//! see [`OpenAIEndpoint`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::generation::{AnswerGenerator, user_prompt};

/// The default OpenAI API base URL.
const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// The default Azure OpenAI API version.
const AZURE_API_VERSION: &str = "2024-07-01-preview";

/// The default model for OpenAI embeddings.
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// The default dimensionality for `text-embedding-3-small`.
const DEFAULT_DIMENSIONS: usize = 1536;

/// The default chat model.
const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";

/// Where requests are sent and how they authenticate.
#[derive(Debug, Clone, PartialEq)]
pub enum OpenAIEndpoint {
    /// The OpenAI API or a compatible server, bearer-token auth.
    OpenAI {
        /// API base, e.g. `https://api.openai.com/v1`.
        base_url: String,
    },
    /// An Azure OpenAI deployment, `api-key` header auth.
    Azure {
        /// Resource endpoint, e.g. `https://my-resource.openai.azure.com`.
        endpoint: String,
        /// Deployment name; Azure routes on this instead of the model field.
        deployment: String,
        /// The `api-version` query parameter.
        api_version: String,
    },
}

impl OpenAIEndpoint {
    /// The public OpenAI API.
    pub fn openai() -> Self {
        Self::OpenAI { base_url: OPENAI_API_BASE.to_string() }
    }

    /// An Azure OpenAI deployment with the default API version.
    pub fn azure(endpoint: impl Into<String>, deployment: impl Into<String>) -> Self {
        Self::Azure {
            endpoint: endpoint.into(),
            deployment: deployment.into(),
            api_version: AZURE_API_VERSION.to_string(),
        }
    }

    /// Full URL for an API operation such as `embeddings` or `chat/completions`.
    pub fn url(&self, operation: &str) -> String {
        match self {
            Self::OpenAI { base_url } => format!("{}/{operation}", base_url.trim_end_matches('/')),
            Self::Azure { endpoint, deployment, api_version } => format!(
                "{}/openai/deployments/{deployment}/{operation}?api-version={api_version}",
                endpoint.trim_end_matches('/')
            ),
        }
    }

    fn authorize(&self, request: reqwest::RequestBuilder, api_key: &str) -> reqwest::RequestBuilder {
        match self {
            Self::OpenAI { .. } => request.bearer_auth(api_key),
            Self::Azure { .. } => request.header("api-key", api_key),
        }
    }

    fn provider_name(&self) -> &'static str {
        match self {
            Self::OpenAI { .. } => "OpenAI",
            Self::Azure { .. } => "AzureOpenAI",
        }
    }
}

fn require_env(name: &str) -> Result<String> {
    std::env::var(name)
        .map_err(|_| RagError::ConfigError(format!("{name} environment variable not set")))
}

fn require_key(api_key: String) -> Result<String> {
    if api_key.is_empty() {
        return Err(RagError::ConfigError("API key must not be empty".to_string()));
    }
    Ok(api_key)
}

// ── OpenAI API request/response types ──────────────────────────────

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Read an error body, preferring the API's structured message.
async fn error_detail(response: reqwest::Response) -> (reqwest::StatusCode, String) {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let detail =
        serde_json::from_str::<ErrorResponse>(&body).map(|e| e.error.message).unwrap_or(body);
    (status, detail)
}

// ── Embeddings ─────────────────────────────────────────────────────

/// An [`EmbeddingProvider`] backed by the OpenAI (or Azure OpenAI) embeddings API.
///
/// # Configuration
///
/// - `model`: defaults to `text-embedding-3-small`.
/// - `dimensions`: optional Matryoshka dimension override.
/// - `api_key`: from the constructor or the environment (`from_env`, `azure_from_env`).
///
/// # Example
///
/// ```rust,ignore
/// use ragkit::openai::OpenAIEmbeddingProvider;
///
/// let provider = OpenAIEmbeddingProvider::new("sk-...")?;
/// let embedding = provider.embed("hello world").await?;
/// ```
pub struct OpenAIEmbeddingProvider {
    client: reqwest::Client,
    endpoint: OpenAIEndpoint,
    api_key: String,
    model: String,
    dimensions: usize,
    /// If set, passed to the API for Matryoshka dimension truncation.
    request_dimensions: Option<usize>,
}

impl OpenAIEmbeddingProvider {
    /// Create a provider for the public OpenAI API.
    ///
    /// Uses the default model (`text-embedding-3-small`) and dimensions (1536).
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_endpoint(api_key, OpenAIEndpoint::openai())
    }

    /// Create a provider for an arbitrary endpoint.
    pub fn with_endpoint(api_key: impl Into<String>, endpoint: OpenAIEndpoint) -> Result<Self> {
        Ok(Self {
            client: reqwest::Client::new(),
            endpoint,
            api_key: require_key(api_key.into())?,
            model: DEFAULT_EMBEDDING_MODEL.into(),
            dimensions: DEFAULT_DIMENSIONS,
            request_dimensions: None,
        })
    }

    /// Create a provider using the `OPENAI_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        Self::new(require_env("OPENAI_API_KEY")?)
    }

    /// Create an Azure provider from `AZURE_OPENAI_EMBEDDING_API_KEY`,
    /// `AZURE_OPENAI_EMBEDDING_ENDPOINT` and `AZURE_OPENAI_EMBEDDING_DEPLOYMENT`.
    pub fn azure_from_env() -> Result<Self> {
        let endpoint = OpenAIEndpoint::azure(
            require_env("AZURE_OPENAI_EMBEDDING_ENDPOINT")?,
            require_env("AZURE_OPENAI_EMBEDDING_DEPLOYMENT")?,
        );
        Self::with_endpoint(require_env("AZURE_OPENAI_EMBEDDING_API_KEY")?, endpoint)
    }

    /// Set the model name (e.g. `text-embedding-3-large`).
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the output dimensions (Matryoshka support).
    ///
    /// When set, the API returns embeddings truncated to this size.
    /// This also updates the value returned by [`dimensions()`](EmbeddingProvider::dimensions).
    pub fn with_dimensions(mut self, dims: usize) -> Self {
        self.dimensions = dims;
        self.request_dimensions = Some(dims);
        self
    }

    fn failure(&self, message: String) -> RagError {
        RagError::EmbeddingError { provider: self.endpoint.provider_name().into(), message }
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAIEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(provider = self.endpoint.provider_name(), text_len = text.len(), "embedding single text");

        let results = self.embed_batch(&[text]).await?;
        results.into_iter().next().ok_or_else(|| self.failure("API returned empty response".into()))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let provider = self.endpoint.provider_name();
        debug!(provider, batch_size = texts.len(), model = %self.model, "embedding batch");

        let request_body = EmbeddingRequest {
            model: &self.model,
            input: texts.to_vec(),
            dimensions: self.request_dimensions,
        };

        let request = self.client.post(self.endpoint.url("embeddings")).json(&request_body);
        let response = self.endpoint.authorize(request, &self.api_key).send().await.map_err(|e| {
            error!(provider, error = %e, "request failed");
            self.failure(format!("request failed: {e}"))
        })?;

        if !response.status().is_success() {
            let (status, detail) = error_detail(response).await;
            error!(provider, %status, "API error");
            return Err(self.failure(format!("API returned {status}: {detail}")));
        }

        let mut embedding_response: EmbeddingResponse = response.json().await.map_err(|e| {
            error!(provider, error = %e, "failed to parse response");
            self.failure(format!("failed to parse response: {e}"))
        })?;

        if embedding_response.data.len() != texts.len() {
            return Err(self.failure(format!(
                "requested {} embeddings, received {}",
                texts.len(),
                embedding_response.data.len()
            )));
        }
        embedding_response.data.sort_by_key(|d| d.index);
        Ok(embedding_response.data.into_iter().map(|d| d.embedding).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

// ── Chat completions ───────────────────────────────────────────────

/// An [`AnswerGenerator`] backed by the OpenAI (or Azure OpenAI) chat completions API.
///
/// Sends the system prompt followed by one user turn of the form
/// `"{context}\n\nUser question: {question}"` at temperature 0.
///
/// # Example
///
/// ```rust,ignore
/// use ragkit::openai::OpenAIChatGenerator;
///
/// let generator = OpenAIChatGenerator::azure_from_env()?;
/// let answer = generator.generate(system_prompt, &context, "Can I return groceries?").await?;
/// ```
pub struct OpenAIChatGenerator {
    client: reqwest::Client,
    endpoint: OpenAIEndpoint,
    api_key: String,
    model: String,
    temperature: f32,
}

impl OpenAIChatGenerator {
    /// Create a generator for the public OpenAI API.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_endpoint(api_key, OpenAIEndpoint::openai())
    }

    /// Create a generator for an arbitrary endpoint.
    pub fn with_endpoint(api_key: impl Into<String>, endpoint: OpenAIEndpoint) -> Result<Self> {
        Ok(Self {
            client: reqwest::Client::new(),
            endpoint,
            api_key: require_key(api_key.into())?,
            model: DEFAULT_CHAT_MODEL.into(),
            temperature: 0.0,
        })
    }

    /// Create a generator using the `OPENAI_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        Self::new(require_env("OPENAI_API_KEY")?)
    }

    /// Create an Azure generator from `AZURE_OPENAI_API_KEY`,
    /// `AZURE_OPENAI_ENDPOINT` and `AZURE_DEPLOYMENT_NAME`.
    pub fn azure_from_env() -> Result<Self> {
        let endpoint = OpenAIEndpoint::azure(
            require_env("AZURE_OPENAI_ENDPOINT")?,
            require_env("AZURE_DEPLOYMENT_NAME")?,
        );
        Self::with_endpoint(require_env("AZURE_OPENAI_API_KEY")?, endpoint)
    }

    /// Set the model name.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    fn failure(&self, message: String) -> RagError {
        RagError::GenerationError { provider: self.endpoint.provider_name().into(), message }
    }
}

#[async_trait]
impl AnswerGenerator for OpenAIChatGenerator {
    async fn generate(
        &self,
        system_prompt: &str,
        context: &str,
        question: &str,
    ) -> Result<String> {
        let provider = self.endpoint.provider_name();
        let user = user_prompt(context, question);
        debug!(provider, model = %self.model, prompt_len = user.len(), "requesting completion");

        let request_body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "system", content: system_prompt },
                ChatMessage { role: "user", content: &user },
            ],
            temperature: self.temperature,
        };

        let request = self.client.post(self.endpoint.url("chat/completions")).json(&request_body);
        let response = self.endpoint.authorize(request, &self.api_key).send().await.map_err(|e| {
            error!(provider, error = %e, "request failed");
            self.failure(format!("request failed: {e}"))
        })?;

        if !response.status().is_success() {
            let (status, detail) = error_detail(response).await;
            error!(provider, %status, "API error");
            return Err(self.failure(format!("API returned {status}: {detail}")));
        }

        let chat_response: ChatResponse = response.json().await.map_err(|e| {
            error!(provider, error = %e, "failed to parse response");
            self.failure(format!("failed to parse response: {e}"))
        })?;

        chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| self.failure("API returned no message content".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openai_url_joins_operation() {
        let endpoint = OpenAIEndpoint::OpenAI { base_url: "http://localhost:8080/v1/".into() };
        assert_eq!(endpoint.url("embeddings"), "http://localhost:8080/v1/embeddings");
    }

    #[test]
    fn azure_url_routes_by_deployment() {
        let endpoint = OpenAIEndpoint::azure("https://res.openai.azure.com/", "chat-4o");
        assert_eq!(
            endpoint.url("chat/completions"),
            "https://res.openai.azure.com/openai/deployments/chat-4o/chat/completions\
             ?api-version=2024-07-01-preview"
        );
    }

    #[test]
    fn empty_key_is_config_error() {
        assert!(matches!(OpenAIEmbeddingProvider::new(""), Err(RagError::ConfigError(_))));
        assert!(matches!(OpenAIChatGenerator::new(""), Err(RagError::ConfigError(_))));
    }

    #[test]
    fn chat_request_serializes_two_turns() {
        let body = ChatRequest {
            model: "m",
            messages: vec![
                ChatMessage { role: "system", content: "sys" },
                ChatMessage { role: "user", content: "ctx\n\nUser question: q" },
            ],
            temperature: 0.0,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "ctx\n\nUser question: q");
    }
}
