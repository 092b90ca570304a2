//! # ragkit-telemetry
//!
//! Subscriber setup for binaries built on `ragkit`, plus an in-memory
//! [`capture`] layer for asserting on emitted events in tests.
//!
//! Filtering follows `RUST_LOG` and falls back to `info`.
//!
//! ```rust,ignore
//! ragkit_telemetry::init_telemetry("support-bot")?;
//! tracing::info!("ready");
//! ```

pub mod capture;

#[cfg(test)]
mod test_capture;
#[cfg(test)]
mod test_init;

use tracing_subscriber::layer::{Layered, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

pub use capture::{CaptureLayer, CapturedEvent, EventLog};

/// Telemetry setup failures.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("a global tracing subscriber is already installed")]
    AlreadyInitialized,

    #[error("invalid filter directives: {0}")]
    InvalidFilter(String),
}

type Base = Layered<EnvFilter, Registry>;

fn default_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

fn install<L>(service_name: &str, filter: EnvFilter, layer: L) -> Result<(), TelemetryError>
where
    L: Layer<Base> + Send + Sync + 'static,
{
    tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init()
        .map_err(|_| TelemetryError::AlreadyInitialized)?;
    tracing::info!(service.name = %service_name, "telemetry initialized");
    Ok(())
}

/// Human-readable output on stdout, filtered by `RUST_LOG` (default `info`).
///
/// # Errors
///
/// [`TelemetryError::AlreadyInitialized`] if any global subscriber is set.
pub fn init_telemetry(service_name: &str) -> Result<(), TelemetryError> {
    install(service_name, default_filter(), fmt::layer().with_target(true))
}

/// JSON lines on stdout, one object per event, with the current span list.
///
/// # Errors
///
/// [`TelemetryError::AlreadyInitialized`] if any global subscriber is set.
pub fn init_json_telemetry(service_name: &str) -> Result<(), TelemetryError> {
    install(service_name, default_filter(), fmt::layer().json().with_span_list(true))
}

/// Human-readable output with explicit filter directives, ignoring `RUST_LOG`.
///
/// ```rust,ignore
/// ragkit_telemetry::init_with_filter("indexer", "ragkit=debug,warn")?;
/// ```
///
/// # Errors
///
/// [`TelemetryError::InvalidFilter`] if `directives` do not parse, otherwise
/// as [`init_telemetry`].
pub fn init_with_filter(service_name: &str, directives: &str) -> Result<(), TelemetryError> {
    let filter =
        EnvFilter::try_new(directives).map_err(|e| TelemetryError::InvalidFilter(e.to_string()))?;
    install(service_name, filter, fmt::layer().with_target(true))
}

/// Human-readable output plus a global [`CaptureLayer`] feeding `log`.
///
/// # Errors
///
/// As [`init_telemetry`].
pub fn init_with_capture(service_name: &str, log: EventLog) -> Result<(), TelemetryError> {
    let layer = fmt::layer().with_target(true).and_then(CaptureLayer::new(log));
    install(service_name, default_filter(), layer)
}
