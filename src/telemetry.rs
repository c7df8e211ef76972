//! Structured telemetry events and sinks.
//!
//! The pipeline is a short-lived local tool, but it still emits a small set
//! of operational events: the schema version applied by migrations and a
//! summary of each completed sync. Events are plain data so tests can assert
//! on them without parsing log output.

use std::io;

use serde::{Deserialize, Serialize};

/// A structured telemetry event emitted by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TelemetryEvent {
    /// Records the database schema version after migrations apply.
    SchemaVersionRecorded {
        /// Diesel migration version string (e.g. `20260830000000`).
        schema_version: String,
    },
    /// Records the outcome of a completed sync run.
    SyncCompleted {
        /// Repositories considered during the run.
        repositories_scanned: usize,
        /// Repositories skipped by the activity gate.
        repositories_skipped: usize,
        /// Cycle-time metric rows derived or refreshed.
        metrics_derived: usize,
    },
}

/// A sink that can record telemetry events.
pub trait TelemetrySink: Send + Sync {
    /// Records a telemetry event.
    fn record(&self, event: TelemetryEvent);
}

/// Telemetry sink that drops all events.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTelemetrySink;

impl TelemetrySink for NoopTelemetrySink {
    fn record(&self, _event: TelemetryEvent) {}
}

/// Records telemetry events to stderr as JSON lines.
///
/// Intended for local debugging; nothing is transmitted anywhere.
#[derive(Debug, Default)]
pub struct StderrJsonlTelemetrySink;

impl TelemetrySink for StderrJsonlTelemetrySink {
    fn record(&self, event: TelemetryEvent) {
        let Ok(serialised) = serde_json::to_string(&event) else {
            return;
        };

        let _ignored = writeln_stderr(&serialised);
    }
}

fn writeln_stderr(message: &str) -> io::Result<()> {
    use io::Write;

    let mut stderr = io::stderr().lock();
    writeln!(stderr, "{message}")
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::{TelemetryEvent, TelemetrySink};

    /// Sink that captures events for assertions.
    #[derive(Debug, Default)]
    pub(crate) struct RecordingSink {
        events: std::sync::Mutex<Vec<TelemetryEvent>>,
    }

    impl RecordingSink {
        pub(crate) fn take(&self) -> Vec<TelemetryEvent> {
            self.events
                .lock()
                .expect("events mutex should be available")
                .drain(..)
                .collect()
        }
    }

    impl TelemetrySink for RecordingSink {
        fn record(&self, event: TelemetryEvent) {
            self.events
                .lock()
                .expect("events mutex should be available")
                .push(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::RecordingSink;
    use super::{TelemetryEvent, TelemetrySink};

    #[test]
    fn recording_sink_captures_events() {
        let sink = RecordingSink::default();
        sink.record(TelemetryEvent::SyncCompleted {
            repositories_scanned: 3,
            repositories_skipped: 1,
            metrics_derived: 2,
        });

        assert_eq!(
            sink.take(),
            vec![TelemetryEvent::SyncCompleted {
                repositories_scanned: 3,
                repositories_skipped: 1,
                metrics_derived: 2,
            }]
        );
    }

    #[test]
    fn schema_version_event_serialises_with_type_tag() {
        let event = TelemetryEvent::SchemaVersionRecorded {
            schema_version: "20260830000000".to_owned(),
        };
        let json = serde_json::to_string(&event).expect("event should serialise");
        assert!(json.contains("\"type\":\"schema_version_recorded\""));
    }
}
