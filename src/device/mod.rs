//! Motor controller connection
//!
//! This module owns everything that touches the serial wire:
//! - Port discovery and the exclusive [`DeviceLink`]
//! - Command frame encoding and status frame parsing
//! - Console entries and telemetry snapshots
//! - A mock serial port for tests

pub mod frame;
pub mod link;
pub mod mock;
pub mod types;

pub use frame::WireFormat;
pub use link::DeviceLink;
pub use mock::MockSerial;
pub use types::{LogEntry, StatusSnapshot, StatusValue};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("Device unavailable: {0}")]
    Unavailable(String),

    #[error("No serial port matching '{0}'")]
    NotFound(String),

    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
