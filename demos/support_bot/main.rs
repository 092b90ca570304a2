//! # Support Bot Example
//!
//! Retail support assistant backed by OpenAI (or Azure OpenAI) embeddings
//! and chat completions. Reads questions from stdin until EOF or `exit`.
//!
//! Environment (a `.env` file is honoured):
//! - `OPENAI_API_KEY`, or
//! - `AZURE_OPENAI_API_KEY`, `AZURE_OPENAI_ENDPOINT`, `AZURE_DEPLOYMENT_NAME`
//!   plus `AZURE_OPENAI_EMBEDDING_API_KEY`, `AZURE_OPENAI_EMBEDDING_ENDPOINT`,
//!   `AZURE_OPENAI_EMBEDDING_DEPLOYMENT` when `RAGKIT_USE_AZURE=1`.
//!
//! Run: `cargo run -p ragkit-demos --example support_bot --features openai`

use std::io::{BufRead, Write};
use std::sync::Arc;

use ragkit::openai::{OpenAIChatGenerator, OpenAIEmbeddingProvider};
use ragkit::{
    AnswerGenerator, Document, EmbeddingProvider, InMemoryVectorIndex, RagConfig, RagPipeline,
    RetryPolicy,
};
use ragkit_demos::STORE_POLICIES;

fn providers() -> ragkit::Result<(Arc<dyn EmbeddingProvider>, Arc<dyn AnswerGenerator>)> {
    if std::env::var("RAGKIT_USE_AZURE").is_ok_and(|v| v == "1") {
        Ok((
            Arc::new(OpenAIEmbeddingProvider::azure_from_env()?),
            Arc::new(OpenAIChatGenerator::azure_from_env()?),
        ))
    } else {
        Ok((
            Arc::new(OpenAIEmbeddingProvider::from_env()?),
            Arc::new(OpenAIChatGenerator::from_env()?),
        ))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    ragkit_telemetry::init_telemetry("support-bot")?;

    let (embedder, generator) = providers()?;
    let pipeline = RagPipeline::builder()
        .config(RagConfig::builder().top_k(3).build()?)
        .embedding_provider(embedder)
        .vector_index(Arc::new(InMemoryVectorIndex::new()))
        .answer_generator(generator)
        .retry_policy(RetryPolicy::default())
        .build()?;

    let documents: Vec<Document> = STORE_POLICIES
        .iter()
        .enumerate()
        .map(|(i, text)| Document::new(format!("policy{i}"), *text))
        .collect();
    pipeline.ingest_batch(&documents).await?;
    tracing::info!(document_count = documents.len(), "support bot ready");

    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("\nAsk a question (or type 'exit'): ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next() else { break };
        let question = line?;
        let question = question.trim();
        if question.eq_ignore_ascii_case("exit") {
            break;
        }
        if question.is_empty() {
            continue;
        }

        match pipeline.answer(question, 3).await {
            Ok(answer) => println!("\nAnswer: {answer}"),
            Err(e) => eprintln!("\nCould not answer: {e}"),
        }
    }

    Ok(())
}
