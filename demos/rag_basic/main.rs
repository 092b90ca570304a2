//! # RAG Basic Example
//!
//! Ingests a handful of store policies, then answers questions from them.
//!
//! Uses `InMemoryVectorIndex`, the offline `HashEmbedder` and a
//! `QuotingGenerator` so it runs with **zero API keys**.
//!
//! Run: `cargo run -p ragkit-demos --example rag_basic`

use std::sync::Arc;

use ragkit::{Document, InMemoryVectorIndex, RagConfig, RagPipeline, VectorIndex};
use ragkit_demos::{HashEmbedder, QuotingGenerator, STORE_POLICIES};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    ragkit_telemetry::init_telemetry("rag-basic")?;

    // -- 1. Configure the pipeline ----------------------------------------
    // Policies are single sentences, so 200-char chunks keep each one whole.
    let config = RagConfig::builder().chunk_size(200).chunk_overlap(20).top_k(3).build()?;

    // -- 2. Build the pipeline with in-memory components ------------------
    let index = Arc::new(InMemoryVectorIndex::new());
    let pipeline = RagPipeline::builder()
        .config(config)
        .embedding_provider(Arc::new(HashEmbedder::new(256)))
        .vector_index(index.clone())
        .answer_generator(Arc::new(QuotingGenerator))
        .build()?;

    // -- 3. Ingest the policy documents -----------------------------------
    let documents: Vec<Document> = STORE_POLICIES
        .iter()
        .enumerate()
        .map(|(i, text)| {
            Document::new(format!("policy{i}"), *text).with_metadata("source", "store-policy")
        })
        .collect();

    let chunks = pipeline.ingest_batch(&documents).await?;
    println!("Ingested {} documents as {} chunks", documents.len(), chunks.len());

    // Re-ingesting overwrites the same chunk IDs.
    pipeline.ingest_batch(&documents).await?;
    println!("Index still holds {} entries after re-ingest", index.len().await?);

    // -- 4. Query and answer ----------------------------------------------
    let questions = [
        "Can I return groceries?",
        "What is the return window for electronics?",
        "Do I need a receipt to get store credit?",
    ];

    for question in questions {
        println!("\nQuestion: {question}");
        for (i, result) in pipeline.query(question).await?.iter().enumerate() {
            println!(
                "  {}. [score={:.4}] {}",
                i + 1,
                result.score,
                result.entry.text().unwrap_or_default()
            );
        }
        println!("Answer: {}", pipeline.answer(question, 1).await?);
    }

    println!("\nDone.");
    Ok(())
}
