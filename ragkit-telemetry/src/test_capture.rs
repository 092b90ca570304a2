use std::time::Duration;

use tracing::{Level, info_span};

use crate::capture::{self, EventLog};

#[test]
fn records_level_message_and_fields() {
    let log = EventLog::new();
    {
        let _guard = capture::scoped(&log);
        tracing::warn!(operation = "embed chunks", attempt = 2u32, delay_ms = 1500u64, "retrying");
        tracing::info!(document.id = %"faq", chunk_count = 3, "ingested document");
    }

    let events = log.events();
    assert_eq!(events.len(), 2);

    let retry = &events[0];
    assert!(retry.is(Level::WARN));
    assert_eq!(retry.message, "retrying");
    assert_eq!(retry.field_str("operation"), Some("embed chunks"));
    assert_eq!(retry.field("attempt"), Some(&serde_json::json!(2)));
    assert_eq!(retry.field("delay_ms"), Some(&serde_json::json!(1500)));

    assert_eq!(events[1].field_str("document.id"), Some("faq"));
    assert_eq!(log.at_level(Level::INFO).len(), 1);
}

#[test]
fn guard_drop_stops_capture() {
    let log = EventLog::new();
    {
        let _guard = capture::scoped(&log);
        tracing::error!("inside");
    }
    tracing::error!("outside");

    assert_eq!(log.len(), 1);
    assert_eq!(log.matching("inside").len(), 1);
    assert!(log.matching("outside").is_empty());
}

#[test]
fn events_remember_their_span() {
    let log = EventLog::new();
    let _guard = capture::scoped(&log);

    let span = info_span!("ingest", document.id = "faq");
    span.in_scope(|| tracing::debug!("chunked"));
    tracing::debug!("no span");

    let events = log.events();
    assert_eq!(events[0].span.as_deref(), Some("ingest"));
    assert_eq!(events[1].span, None);

    log.clear();
    assert!(log.is_empty());
}

#[tokio::test]
async fn captures_across_await_points_on_current_thread() {
    let log = EventLog::new();
    let _guard = capture::scoped(&log);

    tracing::info!("before sleep");
    tokio::time::sleep(Duration::from_millis(5)).await;
    tracing::info!("after sleep");

    let messages: Vec<String> = log.events().into_iter().map(|e| e.message).collect();
    assert_eq!(messages, ["before sleep", "after sleep"]);
}
