//! Configuration loader and validator
//!
//! Loads bridge, client and input settings from a TOML file (by default
//! `configs/default.toml`). Every section is optional; missing values fall
//! back to the defaults below.

use crate::control::command::MOTION;
use crate::control::filter::FilterParams;
use crate::device::frame::WireFormat;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub serial: SerialConfig,

    #[serde(default)]
    pub bridge: BridgeConfig,

    #[serde(default)]
    pub client: ClientConfig,

    #[serde(default)]
    pub input: InputConfig,
}

/// Serial link to the motor controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerialConfig {
    /// Explicit device path; when unset the port is discovered by description
    #[serde(default)]
    pub path: Option<String>,

    /// Substring of the USB product/manufacturer used for discovery
    #[serde(default = "default_match_description")]
    pub match_description: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    /// Read timeout of the reader thread
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,

    /// Delay between discovery attempts at startup
    #[serde(default = "default_discovery_retry_secs")]
    pub discovery_retry_secs: u64,

    #[serde(default)]
    pub wire_format: WireFormat,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            path: None,
            match_description: default_match_description(),
            baud_rate: default_baud_rate(),
            read_timeout_ms: default_read_timeout_ms(),
            discovery_retry_secs: default_discovery_retry_secs(),
            wire_format: WireFormat::default(),
        }
    }
}

fn default_match_description() -> String { "STLink".to_string() }
fn default_baud_rate() -> u32 { 115_200 }
fn default_read_timeout_ms() -> u64 { 1000 }
fn default_discovery_retry_secs() -> u64 { 5 }

/// Bridge (server role) settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Socket address the HTTP bridge listens on
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Maximum console entries kept between drains; oldest are dropped
    #[serde(default = "default_log_capacity")]
    pub log_capacity: usize,

    /// Time given to the controller to answer a status request
    #[serde(default = "default_status_settle_ms")]
    pub status_settle_ms: u64,

    /// Origin allowed by CORS; an empty string disables the CORS layer
    #[serde(default = "default_allowed_origin")]
    pub allowed_origin: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            log_capacity: default_log_capacity(),
            status_settle_ms: default_status_settle_ms(),
            allowed_origin: default_allowed_origin(),
        }
    }
}

fn default_listen() -> String { "127.0.0.1:5000".to_string() }
fn default_log_capacity() -> usize { 64 }
fn default_status_settle_ms() -> u64 { 100 }
fn default_allowed_origin() -> String { "http://localhost:3000".to_string() }

impl BridgeConfig {
    pub fn status_settle(&self) -> Duration {
        Duration::from_millis(self.status_settle_ms)
    }
}

/// Operator client settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the bridge
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_status_timeout_ms")]
    pub status_timeout_ms: u64,

    #[serde(default = "default_log_timeout_ms")]
    pub log_timeout_ms: u64,

    /// Distinct (opcode, motor) slots waiting to be sent; the oldest slot
    /// is dropped when full, a newer command for a pending slot replaces it
    #[serde(default = "default_send_queue")]
    pub send_queue: usize,

    /// Deadline for one command POST; a late command is dropped
    #[serde(default = "default_send_timeout_ms")]
    pub send_timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            poll_interval_ms: default_poll_interval_ms(),
            status_timeout_ms: default_status_timeout_ms(),
            log_timeout_ms: default_log_timeout_ms(),
            send_queue: default_send_queue(),
            send_timeout_ms: default_send_timeout_ms(),
        }
    }
}

fn default_endpoint() -> String { "http://127.0.0.1:5000".to_string() }
fn default_poll_interval_ms() -> u64 { 2000 }
fn default_status_timeout_ms() -> u64 { 200 }
fn default_log_timeout_ms() -> u64 { 1000 }
fn default_send_queue() -> usize { 64 }
fn default_send_timeout_ms() -> u64 { 500 }

impl ClientConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn status_timeout(&self) -> Duration {
        Duration::from_millis(self.status_timeout_ms)
    }

    pub fn log_timeout(&self) -> Duration {
        Duration::from_millis(self.log_timeout_ms)
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }
}

/// Input sampling settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputConfig {
    /// Deadband on the filtered value of each axis
    #[serde(default = "default_threshold")]
    pub threshold: f64,

    /// Multiplier applied to raw device axes before filtering
    #[serde(default = "default_axis_scale")]
    pub axis_scale: f64,

    #[serde(default = "default_gain_x")]
    pub gain_x: f64,

    #[serde(default = "default_gain_y")]
    pub gain_y: f64,

    #[serde(default = "default_motion_opcode")]
    pub motion_opcode: u8,

    /// Sampling cadence of the operator input loop
    #[serde(default = "default_sample_interval_ms")]
    pub sample_interval_ms: u64,

    #[serde(default)]
    pub filter_x: FilterParams,

    #[serde(default)]
    pub filter_y: FilterParams,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            axis_scale: default_axis_scale(),
            gain_x: default_gain_x(),
            gain_y: default_gain_y(),
            motion_opcode: default_motion_opcode(),
            sample_interval_ms: default_sample_interval_ms(),
            filter_x: FilterParams::default(),
            filter_y: FilterParams::default(),
        }
    }
}

fn default_threshold() -> f64 { 0.02 }
fn default_axis_scale() -> f64 { 100.0 }
fn default_gain_x() -> f64 { 50.0 }
fn default_gain_y() -> f64 { 5.0 }
fn default_motion_opcode() -> u8 { MOTION }
fn default_sample_interval_ms() -> u64 { 16 }

impl InputConfig {
    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms)
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        info!("Loading configuration from: {}", path_ref.display());

        let content = std::fs::read_to_string(path_ref)?;
        let config = Self::from_toml(&content)?;

        info!("✓ Config loaded");
        Ok(config)
    }

    /// Load default configuration from configs/default.toml
    pub fn load_default() -> Result<Self, ConfigError> {
        Self::load("configs/default.toml")
    }

    /// Parse and validate configuration text
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;

        debug!("  - Serial: {:?} @ {} baud", config.serial.path, config.serial.baud_rate);
        debug!("  - Bridge: {}", config.bridge.listen);
        debug!("  - Client endpoint: {}", config.client.endpoint);

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.serial.baud_rate == 0 {
            return Err(ConfigError::Invalid("serial.baud_rate must be positive".into()));
        }

        if self.serial.path.is_none() && self.serial.match_description.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "Either serial.path or serial.match_description is required".into(),
            ));
        }

        if self.bridge.listen.parse::<std::net::SocketAddr>().is_err() {
            return Err(ConfigError::Invalid(format!(
                "bridge.listen '{}' is not a socket address",
                self.bridge.listen
            )));
        }

        if self.bridge.log_capacity == 0 {
            return Err(ConfigError::Invalid("bridge.log_capacity must be positive".into()));
        }

        // The bridge only serves plain HTTP and the client is built without TLS
        if !self.client.endpoint.starts_with("http://") {
            return Err(ConfigError::Invalid(format!(
                "client.endpoint '{}' must be an http:// URL",
                self.client.endpoint
            )));
        }

        if self.client.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid("client.poll_interval_ms must be positive".into()));
        }

        if self.client.status_timeout_ms == 0 || self.client.log_timeout_ms == 0 || self.client.send_timeout_ms == 0 {
            return Err(ConfigError::Invalid("client timeouts must be positive".into()));
        }

        if self.client.send_queue == 0 {
            return Err(ConfigError::Invalid("client.send_queue must be positive".into()));
        }

        self.validate_input()
    }

    fn validate_input(&self) -> Result<(), ConfigError> {
        let input = &self.input;

        if !input.threshold.is_finite() || input.threshold < 0.0 {
            return Err(ConfigError::Invalid(
                "input.threshold must be a non-negative number".into(),
            ));
        }

        for (name, value) in [
            ("input.axis_scale", input.axis_scale),
            ("input.gain_x", input.gain_x),
            ("input.gain_y", input.gain_y),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::Invalid(format!("{} must be finite", name)));
            }
        }

        if input.sample_interval_ms == 0 {
            return Err(ConfigError::Invalid("input.sample_interval_ms must be positive".into()));
        }

        input
            .filter_x
            .validate()
            .map_err(|e| ConfigError::Invalid(format!("input.filter_x: {}", e)))?;
        input
            .filter_y
            .validate()
            .map_err(|e| ConfigError::Invalid(format!("input.filter_y: {}", e)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.serial.baud_rate, 115_200);
        assert_eq!(config.serial.wire_format, WireFormat::Text);
        assert_eq!(config.bridge.listen, "127.0.0.1:5000");
        assert_eq!(config.client.poll_interval_ms, 2000);
        assert_eq!(config.client.status_timeout_ms, 200);
        assert_eq!(config.input.threshold, 0.02);
        assert_eq!(config.input.gain_x, 50.0);
        assert_eq!(config.input.gain_y, 5.0);
        assert_eq!(config.input.motion_opcode, 6);
        assert_eq!(config.input.filter_x, FilterParams::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_overrides() {
        let config = Config::from_toml(
            r#"
            [serial]
            path = "/dev/ttyACM0"
            baud_rate = 9600
            wire_format = "packed"

            [input]
            threshold = 0.5
            gain_y = 12.5

            [input.filter_y]
            r = 0.05
            "#,
        )
        .unwrap();

        assert_eq!(config.serial.path.as_deref(), Some("/dev/ttyACM0"));
        assert_eq!(config.serial.baud_rate, 9600);
        assert_eq!(config.serial.wire_format, WireFormat::Packed);
        assert_eq!(config.input.threshold, 0.5);
        assert_eq!(config.input.gain_x, 50.0);
        assert_eq!(config.input.gain_y, 12.5);
        assert_eq!(config.input.filter_y.r, 0.05);
        assert_eq!(config.input.filter_y.q, 0.1);
        assert_eq!(config.input.filter_x, FilterParams::default());
    }

    #[test]
    fn test_invalid_filter_gain() {
        let result = Config::from_toml(
            r#"
            [input.filter_x]
            c = 0.0
            "#,
        );
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_invalid_values() {
        let mut config = Config::default();
        config.input.threshold = -0.1;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.bridge.listen = "not an address".into();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.client.endpoint = "127.0.0.1:5000".into();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.client.poll_interval_ms = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.client.send_timeout_ms = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.serial.match_description = " ".into();
        assert!(config.validate().is_err());
        config.serial.path = Some("COM3".into());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_https_endpoint_rejected() {
        let mut config = Config::default();
        config.client.endpoint = "https://rover.local:5000".into();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(msg)) if msg.contains("http://")));
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            Config::from_toml("[serial\nbaud_rate = 1"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[client]\nendpoint = \"http://10.0.0.2:5000\"").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.client.endpoint, "http://10.0.0.2:5000");
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            Config::load("/nonexistent/roverlink.toml"),
            Err(ConfigError::Io(_))
        ));
    }
}
