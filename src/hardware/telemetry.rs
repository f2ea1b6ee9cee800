use std::{
    collections::BTreeMap,
    fmt::Display,
    sync::{Arc, Mutex},
};

#[cfg(test)]
#[path = "telemetry_tests.rs"]
mod telemetry_tests;

/// A single telemetry value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TelemetryValue {
    /// A flag
    Bool(bool),

    /// A number
    Number(f64),
}

impl Display for TelemetryValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TelemetryValue::Bool(v) => write!(f, "{}", v),
            TelemetryValue::Number(v) => write!(f, "{}", v),
        }
    }
}

impl From<bool> for TelemetryValue {
    fn from(value: bool) -> Self {
        TelemetryValue::Bool(value)
    }
}

impl From<f64> for TelemetryValue {
    fn from(value: f64) -> Self {
        TelemetryValue::Number(value)
    }
}

/// Defines the interface for a consumer of telemetry values.
///
/// Recording is fire-and-forget. A sink that cannot keep up is expected to drop values.
pub trait TelemetrySink {
    /// Records the current value for the given key.
    fn record(&mut self, key: &str, value: TelemetryValue);
}

/// A [TelemetrySink] that writes every value to the `trace` log level.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogTelemetrySink;

impl TelemetrySink for LogTelemetrySink {
    fn record(&mut self, key: &str, value: TelemetryValue) {
        log::trace!("{} = {}", key, value);
    }
}

/// A [TelemetrySink] that keeps the latest value for each key.
///
/// All clones share the same values so that a clone can be kept to read the values after
/// the sink has been handed to a drivetrain.
#[derive(Clone, Debug, Default)]
pub struct RecordingTelemetrySink {
    values: Arc<Mutex<BTreeMap<String, TelemetryValue>>>,
}

impl RecordingTelemetrySink {
    /// Returns the latest value for the given key.
    pub fn get(&self, key: &str) -> Option<TelemetryValue> {
        let values = self.values.lock().unwrap_or_else(|err| err.into_inner());
        values.get(key).copied()
    }

    /// Returns the latest value for the given key if it is a number.
    pub fn number(&self, key: &str) -> Option<f64> {
        match self.get(key) {
            Some(TelemetryValue::Number(v)) => Some(v),
            _ => None,
        }
    }

    /// Returns all keys that have a value, in sorted order.
    pub fn keys(&self) -> Vec<String> {
        let values = self.values.lock().unwrap_or_else(|err| err.into_inner());
        values.keys().cloned().collect()
    }

    /// Creates a new, empty, [RecordingTelemetrySink].
    pub fn new() -> Self {
        Self::default()
    }
}

impl TelemetrySink for RecordingTelemetrySink {
    fn record(&mut self, key: &str, value: TelemetryValue) {
        let mut values = self.values.lock().unwrap_or_else(|err| err.into_inner());
        values.insert(key.to_string(), value);
    }
}
