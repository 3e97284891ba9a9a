//! In-process channel straight into a [`Bridge`]

use super::{ChannelError, CommandChannel};
use crate::bridge::Bridge;
use crate::control::command::Command;
use crate::device::types::{LogEntry, StatusSnapshot};
use async_trait::async_trait;
use log::debug;
use std::sync::Arc;

/// Command channel that skips HTTP and calls the bridge directly
#[derive(Clone)]
pub struct LoopbackChannel {
    bridge: Arc<Bridge>,
}

impl LoopbackChannel {
    pub fn new(bridge: Arc<Bridge>) -> Self {
        Self { bridge }
    }
}

#[async_trait]
impl CommandChannel for LoopbackChannel {
    fn send(&self, command: Command) {
        if let Err(e) = self.bridge.submit(&command) {
            debug!("Dropped {}: {}", command, e);
        }
    }

    async fn poll_status(&self) -> Result<Option<StatusSnapshot>, ChannelError> {
        self.bridge
            .request_status()
            .await
            .map_err(|e| ChannelError::Transport(e.to_string()))
    }

    async fn poll_log(&self) -> Result<Option<Vec<LogEntry>>, ChannelError> {
        Ok(Some(self.bridge.drain_log()))
    }
}
