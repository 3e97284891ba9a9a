//! Command channel - client role
//!
//! Operators talk to the bridge through a [`CommandChannel`]: commands are
//! fire-and-forget, status and console reads are bounded request/response.
//!
//! Two implementations are provided:
//! - [`HttpChannel`]: JSON over HTTP to a remote bridge
//! - [`LoopbackChannel`]: direct calls into an in-process [`Bridge`](crate::bridge::Bridge)

pub mod http;
pub mod loopback;
pub mod wire;

pub use http::HttpChannel;
pub use loopback::LoopbackChannel;

use crate::control::command::Command;
use crate::device::types::{LogEntry, StatusSnapshot};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ChannelError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Request timed out after {0} ms")]
    Timeout(u64),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

/// Client side of the bridge protocol
#[async_trait]
pub trait CommandChannel: Send + Sync {
    /// Queue a command for the bridge. No acknowledgement, no retry; when the
    /// transport is down the command is dropped.
    fn send(&self, command: Command);

    /// Fetch the current status snapshot; `Ok(None)` when the bridge has none
    async fn poll_status(&self) -> Result<Option<StatusSnapshot>, ChannelError>;

    /// Drain pending console entries; `Ok(None)` when the bridge sent no data
    async fn poll_log(&self) -> Result<Option<Vec<LogEntry>>, ChannelError>;
}
