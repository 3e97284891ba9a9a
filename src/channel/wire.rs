//! JSON bodies exchanged between the operator client and the bridge

use crate::device::types::{LogEntry, StatusSnapshot};
use serde::{Deserialize, Serialize};

/// Route accepting command bodies
pub const SEND_PATH: &str = "/send";

/// Route returning the latest status snapshot
pub const STATUS_PATH: &str = "/status";

/// Route draining pending console entries
pub const CONSOLE_PATH: &str = "/console";

/// Route reporting device link health
pub const HEALTH_PATH: &str = "/health";

/// Plain acknowledgement or error message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

/// `GET /status` body; `data` is absent when the device has not reported
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<StatusSnapshot>,
}

/// `GET /console` body
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConsoleResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<LogEntry>>,
}

/// `GET /health` body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub device: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_data_parses_as_none() {
        let status: StatusResponse = serde_json::from_str("{}").unwrap();
        assert!(status.data.is_none());

        let status: StatusResponse =
            serde_json::from_str(r#"{ "message": "No status received", "data": null }"#).unwrap();
        assert!(status.data.is_none());

        let console: ConsoleResponse = serde_json::from_str("{}").unwrap();
        assert!(console.data.is_none());
    }

    #[test]
    fn test_console_body_shape() {
        let body = ConsoleResponse {
            data: Some(vec![LogEntry::new(12.5, "armed")]),
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({ "data": [[12.5, "armed"]] })
        );
    }

    #[test]
    fn test_status_without_data_omits_field() {
        let body = StatusResponse {
            message: Some("No status received".into()),
            data: None,
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({ "message": "No status received" })
        );
    }
}
