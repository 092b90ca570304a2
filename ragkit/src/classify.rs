//! Delivery-delay log classification.
//!
//! A keyword heuristic assigns every log line an initial [`DelayCategory`];
//! an [`AnswerGenerator`] is then asked to confirm or correct it. The model
//! call runs under a [`RetryPolicy`], so rate limits and flaky responses are
//! absorbed without failing the whole batch.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{RagError, Result};
use crate::generation::AnswerGenerator;
use crate::retry::RetryPolicy;

/// Why a delivery was late.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DelayCategory {
    /// Congestion or a road accident.
    Traffic,
    /// Recipient absent or changed the appointment.
    CustomerIssue,
    /// Breakdown or mechanical warning.
    VehicleIssue,
    /// Rain, wind or storms.
    Weather,
    /// Unreadable barcodes, bad labels, manual re-sorting.
    SortingLabelingError,
    /// Driver or staff mistakes.
    HumanError,
    /// Crashed systems, scanner faults, glitches.
    TechnicalSystemFailure,
    /// Anything else, including on-time deliveries.
    Other,
}

impl DelayCategory {
    /// Every category, in prompt order.
    pub const ALL: [DelayCategory; 8] = [
        DelayCategory::Traffic,
        DelayCategory::CustomerIssue,
        DelayCategory::VehicleIssue,
        DelayCategory::Weather,
        DelayCategory::SortingLabelingError,
        DelayCategory::HumanError,
        DelayCategory::TechnicalSystemFailure,
        DelayCategory::Other,
    ];

    /// Human-readable label, as used in prompts and replies.
    pub fn label(self) -> &'static str {
        match self {
            DelayCategory::Traffic => "Traffic",
            DelayCategory::CustomerIssue => "Customer Issue",
            DelayCategory::VehicleIssue => "Vehicle Issue",
            DelayCategory::Weather => "Weather",
            DelayCategory::SortingLabelingError => "Sorting/Labeling Error",
            DelayCategory::HumanError => "Human Error",
            DelayCategory::TechnicalSystemFailure => "Technical System Failure",
            DelayCategory::Other => "Other",
        }
    }
}

impl fmt::Display for DelayCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

impl FromStr for DelayCategory {
    type Err = RagError;

    /// Accepts a label case-insensitively, ignoring surrounding quotes,
    /// list markers and trailing punctuation.
    fn from_str(s: &str) -> Result<Self> {
        let cleaned = s.trim().trim_start_matches(['-', '*']).trim().trim_matches(|c: char| {
            matches!(c, '"' | '\'' | '`' | '.' | ',' | ';' | ':')
        });
        DelayCategory::ALL
            .into_iter()
            .find(|category| category.label().eq_ignore_ascii_case(cleaned.trim()))
            .ok_or_else(|| RagError::InvalidArgument(format!("unknown delay category: {s:?}")))
    }
}

/// Keyword table consulted in order; the first substring hit wins.
const KEYWORDS: [(&str, DelayCategory); 19] = [
    ("traffic", DelayCategory::Traffic),
    ("accident", DelayCategory::Traffic),
    ("customer", DelayCategory::CustomerIssue),
    ("unavailable", DelayCategory::CustomerIssue),
    ("engine", DelayCategory::VehicleIssue),
    ("vehicle", DelayCategory::VehicleIssue),
    ("rain", DelayCategory::Weather),
    ("wind", DelayCategory::Weather),
    ("storm", DelayCategory::Weather),
    ("label", DelayCategory::SortingLabelingError),
    ("barcode", DelayCategory::SortingLabelingError),
    ("manual", DelayCategory::SortingLabelingError),
    ("wrong", DelayCategory::HumanError),
    ("missed", DelayCategory::HumanError),
    ("forgot", DelayCategory::HumanError),
    ("system", DelayCategory::TechnicalSystemFailure),
    ("glitch", DelayCategory::TechnicalSystemFailure),
    ("crashed", DelayCategory::TechnicalSystemFailure),
    ("scanner", DelayCategory::TechnicalSystemFailure),
];

/// Cheap first-pass category from keywords; [`DelayCategory::Other`] if none match.
pub fn heuristic_category(text: &str) -> DelayCategory {
    let lowered = text.to_lowercase();
    KEYWORDS
        .iter()
        .find(|(keyword, _)| lowered.contains(keyword))
        .map_or(DelayCategory::Other, |(_, category)| *category)
}

/// One line of a delivery log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Caller-assigned identifier, echoed in the [`Classification`].
    pub id: String,
    /// Free-text description of what happened.
    pub text: String,
}

impl LogEntry {
    /// Create a log entry.
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self { id: id.into(), text: text.into() }
    }
}

/// The outcome for one [`LogEntry`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    /// The entry's [`LogEntry::id`].
    pub log_id: String,
    /// The entry's text.
    pub log_entry: String,
    /// Keyword heuristic label.
    pub initial: DelayCategory,
    /// Label after model review; equals `initial` when the model agreed.
    pub refined: DelayCategory,
}

fn system_prompt() -> String {
    let options: Vec<String> =
        DelayCategory::ALL.iter().map(|category| format!("- {category}")).collect();
    format!(
        "You are a logistics assistant. Given a delivery log entry and a suggested category, \
         confirm or correct it by choosing one of the following categories:\n{}\n\
         Return only the most appropriate category from the list above.",
        options.join("\n")
    )
}

/// Classifies delivery-delay log lines with a heuristic plus model refinement.
///
/// # Example
///
/// ```rust,ignore
/// use ragkit::classify::{DelayClassifier, LogEntry};
///
/// let classifier = DelayClassifier::new(generator, RetryPolicy::default());
/// let result = classifier.classify(&LogEntry::new("1", "Heavy traffic near depot")).await?;
/// ```
pub struct DelayClassifier {
    generator: Arc<dyn AnswerGenerator>,
    retry: RetryPolicy,
    system_prompt: String,
}

impl DelayClassifier {
    /// Create a classifier that refines labels with `generator` under `retry`.
    pub fn new(generator: Arc<dyn AnswerGenerator>, retry: RetryPolicy) -> Self {
        Self { generator, retry, system_prompt: system_prompt() }
    }

    /// Classify one entry.
    ///
    /// A reply that names no known category keeps the heuristic label.
    ///
    /// # Errors
    ///
    /// Returns the generator error that survived the retry policy.
    pub async fn classify(&self, entry: &LogEntry) -> Result<Classification> {
        let initial = heuristic_category(&entry.text);
        let context = format!("Log Entry:\n\"\"\"{}\"\"\"", entry.text);
        let question = format!(
            "This entry has been auto-categorized as \"{initial}\". \
             Reply with the correct category only."
        );

        let reply = self
            .retry
            .run("refine classification", || {
                self.generator.generate(&self.system_prompt, &context, &question)
            })
            .await?;

        let refined = reply.parse::<DelayCategory>().unwrap_or_else(|_| {
            warn!(log.id = %entry.id, reply = %reply.trim(), "unrecognised category, keeping heuristic");
            initial
        });

        Ok(Classification {
            log_id: entry.id.clone(),
            log_entry: entry.text.clone(),
            initial,
            refined,
        })
    }

    /// Classify entries in order, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// Returns the first generator error that survived the retry policy.
    pub async fn classify_all(&self, entries: &[LogEntry]) -> Result<Vec<Classification>> {
        let mut results = Vec::with_capacity(entries.len());
        for entry in entries {
            results.push(self.classify(entry).await?);
        }
        let corrected = results.iter().filter(|r| r.initial != r.refined).count();
        info!(entry_count = results.len(), corrected, "classified log entries");
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;

    use super::*;

    #[test]
    fn heuristic_follows_keyword_order() {
        assert_eq!(heuristic_category("Heavy traffic near depot"), DelayCategory::Traffic);
        assert_eq!(
            heuristic_category("Customer wasn't available at drop-off"),
            DelayCategory::CustomerIssue
        );
        assert_eq!(heuristic_category("Thunderstorm delayed departure"), DelayCategory::Weather);
        assert_eq!(
            heuristic_category("Barcode unreadable, needed manual entry"),
            DelayCategory::SortingLabelingError
        );
        assert_eq!(heuristic_category("Driver missed turn and rerouted"), DelayCategory::HumanError);
        assert_eq!(
            heuristic_category("Navigation system crashed"),
            DelayCategory::TechnicalSystemFailure
        );
        assert_eq!(heuristic_category("Arrived on schedule, no delay"), DelayCategory::Other);
    }

    #[test]
    fn parses_labels_loosely() {
        assert_eq!("Weather".parse::<DelayCategory>().unwrap(), DelayCategory::Weather);
        assert_eq!(
            "  \"sorting/labeling error\".\n".parse::<DelayCategory>().unwrap(),
            DelayCategory::SortingLabelingError
        );
        assert_eq!("- Human Error".parse::<DelayCategory>().unwrap(), DelayCategory::HumanError);
        assert!("Aliens".parse::<DelayCategory>().is_err());
    }

    #[test]
    fn every_label_parses_back_and_pads() {
        for category in DelayCategory::ALL {
            assert_eq!(category.to_string().parse::<DelayCategory>().unwrap(), category);
        }
        assert_eq!(format!("{:<9}|", DelayCategory::Weather), "Weather  |");
        let entry = LogEntry::new("7", "Scanner offline");
        assert_eq!((entry.id.as_str(), entry.text.as_str()), ("7", "Scanner offline"));
    }

    #[test]
    fn prompt_lists_every_category() {
        let prompt = system_prompt();
        for category in DelayCategory::ALL {
            assert!(prompt.contains(category.label()));
        }
    }

    struct Scripted {
        replies: Mutex<Vec<Result<String>>>,
        calls: AtomicU32,
    }

    impl Scripted {
        fn new(mut replies: Vec<Result<String>>) -> Self {
            replies.reverse();
            Self { replies: Mutex::new(replies), calls: AtomicU32::new(0) }
        }
    }

    #[async_trait]
    impl AnswerGenerator for Scripted {
        async fn generate(&self, _system: &str, context: &str, question: &str) -> Result<String> {
            assert!(context.contains("Log Entry"));
            assert!(question.contains("auto-categorized"));
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.replies.lock().unwrap().pop().unwrap_or_else(|| Ok("Other".into()))
        }
    }

    fn rate_limited() -> RagError {
        RagError::GenerationError { provider: "stub".into(), message: "429".into() }
    }

    #[tokio::test(start_paused = true)]
    async fn model_can_correct_the_heuristic() {
        let generator = Arc::new(Scripted::new(vec![Err(rate_limited()), Ok("Weather".into())]));
        let classifier = DelayClassifier::new(generator.clone(), RetryPolicy::default());

        let result = classifier
            .classify(&LogEntry::new("4", "Accident caused by icy roads"))
            .await
            .unwrap();
        assert_eq!(result.initial, DelayCategory::Traffic);
        assert_eq!(result.refined, DelayCategory::Weather);
        assert_eq!(generator.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn unparseable_reply_keeps_heuristic() {
        let generator = Arc::new(Scripted::new(vec![Ok("I am not sure".into())]));
        let classifier = DelayClassifier::new(generator, RetryPolicy::none());

        let result =
            classifier.classify(&LogEntry::new("1", "Heavy traffic near depot")).await.unwrap();
        assert_eq!(result.refined, DelayCategory::Traffic);
    }

    #[tokio::test(start_paused = true)]
    async fn classify_all_surfaces_exhausted_retries() {
        let generator = Arc::new(Scripted::new(vec![
            Ok("Traffic".into()),
            Err(rate_limited()),
            Err(rate_limited()),
        ]));
        let classifier =
            DelayClassifier::new(generator.clone(), RetryPolicy::default().with_max_attempts(2));

        let entries = [LogEntry::new("1", "traffic jam"), LogEntry::new("2", "rain delay")];
        let err = classifier.classify_all(&entries).await.unwrap_err();
        assert!(matches!(err, RagError::GenerationError { .. }));
        assert_eq!(generator.calls.load(Ordering::SeqCst), 3);
    }
}
