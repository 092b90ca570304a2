//! # Delay Classifier Example
//!
//! Labels delivery-delay log lines with a keyword heuristic, then asks an
//! Azure OpenAI deployment to confirm or correct each label. Rate limits are
//! absorbed by the retry policy.
//!
//! Environment (a `.env` file is honoured): `AZURE_OPENAI_API_KEY`,
//! `AZURE_OPENAI_ENDPOINT`, `AZURE_DEPLOYMENT_NAME`.
//!
//! Run: `cargo run -p ragkit-demos --example delay_classifier --features openai`

use std::sync::Arc;

use ragkit::RetryPolicy;
use ragkit::classify::{DelayClassifier, LogEntry};
use ragkit::openai::OpenAIChatGenerator;
use ragkit_demos::DELIVERY_LOGS;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    ragkit_telemetry::init_telemetry("delay-classifier")?;

    let generator = Arc::new(OpenAIChatGenerator::azure_from_env()?);
    let classifier = DelayClassifier::new(generator, RetryPolicy::default());

    let entries: Vec<LogEntry> = DELIVERY_LOGS
        .iter()
        .enumerate()
        .map(|(i, text)| LogEntry::new((i + 1).to_string(), *text))
        .collect();

    let results = classifier.classify_all(&entries).await?;

    println!("{:<4} {:<45} {:<26} {}", "id", "log entry", "heuristic", "refined");
    for result in &results {
        let marker = if result.initial == result.refined { "" } else { " *" };
        println!(
            "{:<4} {:<45} {:<26} {}{marker}",
            result.log_id, result.log_entry, result.initial, result.refined
        );
    }
    Ok(())
}
