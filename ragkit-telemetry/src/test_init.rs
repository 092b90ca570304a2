use crate::{TelemetryError, init_json_telemetry, init_telemetry, init_with_filter};

// The global subscriber is process-wide, so every global install lives in this one test.
#[test]
fn second_global_install_reports_already_initialized() {
    assert!(matches!(
        init_with_filter("ragkit-test", "ragkit=loud"),
        Err(TelemetryError::InvalidFilter(_))
    ));

    init_with_filter("ragkit-test", "ragkit=debug,warn").unwrap();

    assert!(matches!(init_telemetry("ragkit-test"), Err(TelemetryError::AlreadyInitialized)));
    assert!(matches!(
        init_json_telemetry("ragkit-test"),
        Err(TelemetryError::AlreadyInitialized)
    ));
}
