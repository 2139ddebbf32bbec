//! Structured logging seam.
//!
//! The migration engine reports what it did through a [`StructuredLogger`]
//! rather than writing to the global subscriber directly, so tests can
//! capture the emitted events. The production implementation forwards to
//! `tracing`.

use serde_json::Value;

/// Sink for leveled structured events.
///
/// Implementations must never fail or block; the events are purely
/// observational and carry no control-flow meaning.
pub trait StructuredLogger: Send + Sync {
    /// Emits an informational event with attached diagnostic fields.
    fn info(&self, message: &str, fields: &[(&str, Value)]);
}

/// [`StructuredLogger`] that forwards events to the `tracing` subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl StructuredLogger for TracingLogger {
    fn info(&self, message: &str, fields: &[(&str, Value)]) {
        let fields = Value::Object(
            fields
                .iter()
                .map(|(key, value)| (key.to_string(), value.clone()))
                .collect(),
        );
        tracing::info!(%fields, "{message}");
    }
}

/// Logger that discards every event. Useful for callers that have no
/// subscriber installed.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLogger;

impl StructuredLogger for NoopLogger {
    fn info(&self, _message: &str, _fields: &[(&str, Value)]) {}
}
