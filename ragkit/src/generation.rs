//! Answer generator trait for producing natural-language answers.

use async_trait::async_trait;

use crate::error::Result;

/// The default system prompt handed to an [`AnswerGenerator`].
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful support assistant. Use the provided \
     information to answer the user's question. Always cite the retrieved info in your answer. \
     If the information does not contain the answer, say that you do not know.";

/// A chat-completion backend that answers a question given retrieved context.
///
/// Failures are reported as [`RagError::GenerationError`](crate::RagError::GenerationError),
/// which callers treat as retryable.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    /// Produce an answer to `question` conditioned on `context`.
    async fn generate(&self, system_prompt: &str, context: &str, question: &str)
    -> Result<String>;
}

/// Render the user turn sent alongside the system prompt.
pub fn user_prompt(context: &str, question: &str) -> String {
    format!("{context}\n\nUser question: {question}")
}
