//! HTTP client for a remote bridge
//!
//! Polls are plain GETs bounded by a timeout. Commands wait in a
//! [`PendingCommands`] set drained by a single sender task. There is one slot
//! per `(command, motor)`: a newer setpoint replaces a pending one in place,
//! so a slow bridge receives the latest intent rather than a backlog. Slots
//! go out in the order they were first filled. A failed or late POST drops
//! the command; nothing is retried.

use super::wire::{ConsoleResponse, MessageResponse, StatusResponse, CONSOLE_PATH, SEND_PATH, STATUS_PATH};
use super::{ChannelError, CommandChannel};
use crate::config::ClientConfig;
use crate::control::command::Command;
use crate::device::types::{LogEntry, StatusSnapshot};
use async_trait::async_trait;
use log::{debug, info, trace, warn};
use serde::de::DeserializeOwned;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::Notify;

type Slot = (u8, u8);

/// Latest unsent command per `(command, motor)`
#[derive(Debug, Default)]
pub struct PendingCommands {
    order: VecDeque<Slot>,
    latest: HashMap<Slot, Command>,
    capacity: usize,
    closed: bool,
}

impl PendingCommands {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            ..Self::default()
        }
    }

    /// Add a command; returns the command it displaced, if any
    pub fn push(&mut self, command: Command) -> Option<Command> {
        let slot = (command.command, command.motor);
        if let Some(pending) = self.latest.get_mut(&slot) {
            return Some(std::mem::replace(pending, command));
        }

        let mut evicted = None;
        if self.order.len() == self.capacity {
            evicted = self.order.pop_front().and_then(|oldest| self.latest.remove(&oldest));
        }
        self.order.push_back(slot);
        self.latest.insert(slot, command);
        evicted
    }

    /// Take the oldest pending slot
    pub fn pop(&mut self) -> Option<Command> {
        let slot = self.order.pop_front()?;
        self.latest.remove(&slot)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Pending set shared with the sender task
#[derive(Debug)]
struct SendQueue {
    pending: Mutex<PendingCommands>,
    wake: Notify,
}

impl SendQueue {
    fn lock(&self) -> MutexGuard<'_, PendingCommands> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn close(&self) {
        self.lock().closed = true;
        self.wake.notify_one();
    }
}

/// Command channel speaking JSON over HTTP
pub struct HttpChannel {
    client: reqwest::Client,
    base_url: String,
    status_timeout: Duration,
    log_timeout: Duration,
    queue: Arc<SendQueue>,
}

impl HttpChannel {
    /// Create the channel and start its sender task (needs a tokio runtime)
    pub fn connect(config: &ClientConfig) -> Result<Self, ChannelError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| ChannelError::Transport(e.to_string()))?;

        let base_url = config.endpoint.trim_end_matches('/').to_string();
        let queue = Arc::new(SendQueue {
            pending: Mutex::new(PendingCommands::new(config.send_queue)),
            wake: Notify::new(),
        });

        tokio::spawn(run_sender(
            client.clone(),
            format!("{}{}", base_url, SEND_PATH),
            config.send_timeout(),
            Arc::clone(&queue),
        ));
        info!("Command channel ready for {}", base_url);

        Ok(Self {
            client,
            base_url,
            status_timeout: config.status_timeout(),
            log_timeout: config.log_timeout(),
            queue,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POST one command outside the queue and wait for the bridge's answer
    ///
    /// For one-shot tools; the control loop uses [`CommandChannel::send`].
    pub async fn send_now(&self, command: Command) -> Result<String, ChannelError> {
        let url = format!("{}{}", self.base_url, SEND_PATH);
        let response = self.client.post(&url).json(&command).send().await.map_err(transport_error)?;

        let status = response.status();
        let body: MessageResponse = response
            .json()
            .await
            .map_err(|e| ChannelError::MalformedResponse(e.to_string()))?;

        if status.is_success() {
            Ok(body.message)
        } else {
            Err(ChannelError::Transport(format!("{} ({})", body.message, status)))
        }
    }

    /// GET a JSON body, bounded by `limit`
    async fn get_json<T: DeserializeOwned>(&self, path: &str, limit: Duration) -> Result<T, ChannelError> {
        let url = format!("{}{}", self.base_url, path);

        let request = async {
            let response = self.client.get(&url).send().await.map_err(transport_error)?;

            let status = response.status();
            if !status.is_success() {
                return Err(ChannelError::Transport(format!("GET {} returned {}", path, status)));
            }

            response.bytes().await.map_err(transport_error)
        };

        let body = tokio::time::timeout(limit, request)
            .await
            .map_err(|_| ChannelError::Timeout(limit.as_millis() as u64))??;

        serde_json::from_slice(&body).map_err(|e| ChannelError::MalformedResponse(e.to_string()))
    }
}

#[async_trait]
impl CommandChannel for HttpChannel {
    fn send(&self, command: Command) {
        match self.queue.lock().push(command) {
            Some(stale) if (stale.command, stale.motor) == (command.command, command.motor) => {
                trace!("Superseded {} with {}", stale, command)
            }
            Some(stale) => debug!("Send queue full, dropping oldest {}", stale),
            None => trace!("Queued {}", command),
        }
        self.queue.wake.notify_one();
    }

    async fn poll_status(&self) -> Result<Option<StatusSnapshot>, ChannelError> {
        match self.get_json::<StatusResponse>(STATUS_PATH, self.status_timeout).await {
            Ok(response) => Ok(response.data),
            Err(ChannelError::MalformedResponse(e)) => {
                warn!("Ignoring malformed status response: {}", e);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn poll_log(&self) -> Result<Option<Vec<LogEntry>>, ChannelError> {
        match self.get_json::<ConsoleResponse>(CONSOLE_PATH, self.log_timeout).await {
            Ok(response) => Ok(response.data),
            Err(ChannelError::MalformedResponse(e)) => {
                warn!("Ignoring malformed console response: {}", e);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

impl Drop for HttpChannel {
    fn drop(&mut self) {
        self.queue.close();
    }
}

/// POST pending commands one at a time until the channel is dropped
async fn run_sender(client: reqwest::Client, url: String, deadline: Duration, queue: Arc<SendQueue>) {
    debug!("Sender task started for {}", url);

    loop {
        let next = {
            let mut pending = queue.lock();
            if pending.closed {
                break;
            }
            pending.pop()
        };

        let Some(command) = next else {
            queue.wake.notified().await;
            continue;
        };

        match client.post(&url).timeout(deadline).json(&command).send().await {
            Ok(response) if response.status().is_success() => trace!("Sent {}", command),
            Ok(response) => debug!("Bridge rejected {}: {}", command, response.status()),
            Err(e) if e.is_timeout() => debug!("Dropped {}: no answer within {} ms", command, deadline.as_millis()),
            Err(e) => debug!("Dropped {}: {}", command, e),
        }
    }

    debug!("Sender task exited");
}

fn transport_error(e: reqwest::Error) -> ChannelError {
    ChannelError::Transport(e.to_string())
}
