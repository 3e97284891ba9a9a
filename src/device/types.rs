//! Device data types
//!
//! Console lines and telemetry snapshots produced by the device link and
//! served to operators by the bridge.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One console line from the controller (or a bridge notice)
///
/// Serialized as `[timestamp_seconds, text]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "(f64, String)", into = "(f64, String)")]
pub struct LogEntry {
    /// Wall-clock seconds since the Unix epoch, fractional
    pub timestamp: f64,
    pub text: String,
}

impl LogEntry {
    pub fn new(timestamp: f64, text: impl Into<String>) -> Self {
        Self { timestamp, text: text.into() }
    }

    /// Entry stamped with the current wall-clock time
    pub fn now(text: impl Into<String>) -> Self {
        Self::new(now_seconds(), text)
    }
}

impl From<(f64, String)> for LogEntry {
    fn from((timestamp, text): (f64, String)) -> Self {
        Self { timestamp, text }
    }
}

impl From<LogEntry> for (f64, String) {
    fn from(entry: LogEntry) -> Self {
        (entry.timestamp, entry.text)
    }
}

/// Current wall-clock time in fractional seconds
pub fn now_seconds() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

/// A single telemetry field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatusValue {
    Number(f64),
    Text(String),
}

impl fmt::Display for StatusValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Two decimals is what the operator UI shows
            StatusValue::Number(n) => write!(f, "{:.2}", n),
            StatusValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for StatusValue {
    fn from(value: f64) -> Self {
        StatusValue::Number(value)
    }
}

impl From<&str> for StatusValue {
    fn from(value: &str) -> Self {
        StatusValue::Text(value.to_string())
    }
}

/// Point-in-time telemetry readout; replaced wholesale, never merged
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusSnapshot {
    pub fields: BTreeMap<String, StatusValue>,
}

impl StatusSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<StatusValue>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&StatusValue> {
        self.fields.get(key)
    }

    pub fn number(&self, key: &str) -> Option<f64> {
        match self.fields.get(key) {
            Some(StatusValue::Number(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_entry_serializes_as_pair() {
        let entry = LogEntry::new(1700000000.25, "motor ready");
        let json = serde_json::to_string(&entry).unwrap();
        assert_eq!(json, r#"[1700000000.25,"motor ready"]"#);

        let back: LogEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, entry);
    }

    #[test]
    fn test_now_is_recent() {
        let entry = LogEntry::now("x");
        assert!(entry.timestamp > 1_600_000_000.0);
    }

    #[test]
    fn test_snapshot_json_is_flat_map() {
        let snapshot = StatusSnapshot::new()
            .with("DEGX", 12.5)
            .with("message", "ok");

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json, serde_json::json!({ "DEGX": 12.5, "message": "ok" }));

        let back: StatusSnapshot = serde_json::from_value(json).unwrap();
        assert_eq!(back.number("DEGX"), Some(12.5));
        assert_eq!(back.get("message"), Some(&StatusValue::Text("ok".into())));
    }

    #[test]
    fn test_integer_fields_parse_as_numbers() {
        let snapshot: StatusSnapshot =
            serde_json::from_str(r#"{ "controlMode": 3, "startByte": 255 }"#).unwrap();
        assert_eq!(snapshot.number("controlMode"), Some(3.0));
        assert_eq!(snapshot.len(), 2);
    }

    #[test]
    fn test_status_value_display() {
        assert_eq!(StatusValue::Number(1.23456).to_string(), "1.23");
        assert_eq!(StatusValue::from("idle").to_string(), "idle");
    }
}
