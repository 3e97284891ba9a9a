//! Bridge - server role of the command channel
//!
//! The bridge sits between operators and the device link. It forwards
//! commands verbatim, asks the controller for status on demand, and hands out
//! console entries exactly once.

pub mod handlers;
pub mod server;

pub use server::BridgeServer;

use crate::control::command::Command;
use crate::device::{DeviceError, DeviceLink, LogEntry, StatusSnapshot};
use log::{debug, trace};
use std::sync::Arc;
use std::time::Duration;

/// Server-side state shared by every connection
pub struct Bridge {
    link: Arc<DeviceLink>,
    status_settle: Duration,
}

impl Bridge {
    pub fn new(link: Arc<DeviceLink>, status_settle: Duration) -> Self {
        Self { link, status_settle }
    }

    pub fn link(&self) -> &DeviceLink {
        &self.link
    }

    /// Forward a command to the device; rejected when the link is down
    pub fn submit(&self, command: &Command) -> Result<(), DeviceError> {
        trace!("Forwarding {}", command);
        self.link.write(command)
    }

    /// Ask the controller for a status frame and return the latest snapshot
    ///
    /// The snapshot may predate this request if the controller answers slower
    /// than the settle time.
    pub async fn request_status(&self) -> Result<Option<StatusSnapshot>, DeviceError> {
        self.link.write(&Command::status_request())?;
        tokio::time::sleep(self.status_settle).await;

        let status = self.link.latest_status();
        debug!("Status request answered: {}", if status.is_some() { "snapshot" } else { "none" });
        Ok(status)
    }

    /// Read and clear pending console entries
    pub fn drain_log(&self) -> Vec<LogEntry> {
        self.link.drain_log()
    }

    pub fn is_device_healthy(&self) -> bool {
        self.link.is_healthy()
    }
}
