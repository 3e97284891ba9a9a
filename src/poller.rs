//! Status poller - connection state machine for the operator
//!
//! Every interval the poller drains the bridge console and, when that works,
//! asks for a status snapshot. A failed console poll is what marks the bridge
//! as disconnected; the next successful one reconnects. Retries happen at the
//! fixed interval with no backoff.
//!
//! ```text
//! Connected ──err──▶ Disconnected ──tick──▶ Reconnecting ──ok──▶ Connected
//!                         ▲                      │
//!                         └─────────err──────────┘
//! ```

use crate::channel::CommandChannel;
use crate::device::types::{LogEntry, StatusSnapshot};
use log::{debug, info, trace, warn};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Connected,
    Disconnected,
    Reconnecting,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Connected => "connected",
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Reconnecting => "reconnecting",
        };
        f.write_str(name)
    }
}

/// Callbacks from the poller; every method defaults to doing nothing
pub trait PollObserver: Send {
    /// Any state change, including `Disconnected -> Reconnecting`
    fn on_transition(&mut self, _from: ConnectionState, _to: ConnectionState) {}

    /// Bridge lost; fires once per outage
    fn on_disconnected(&mut self) {}

    /// Bridge reachable again after an outage
    fn on_reconnected(&mut self) {}

    /// Console entries drained by this tick (never empty)
    fn on_log(&mut self, _entries: &[LogEntry]) {}

    fn on_status(&mut self, _status: &StatusSnapshot) {}
}

/// Observer that reports everything through the `log` facade
#[derive(Debug, Default)]
pub struct LogObserver;

impl PollObserver for LogObserver {
    fn on_disconnected(&mut self) {
        warn!("Connection to bridge lost, retrying...");
    }

    fn on_reconnected(&mut self) {
        info!("✓ Connection to bridge restored");
    }

    fn on_log(&mut self, entries: &[LogEntry]) {
        for entry in entries {
            info!("[device {}] {}", format_timestamp(entry.timestamp), entry.text);
        }
    }

    fn on_status(&mut self, status: &StatusSnapshot) {
        let fields: Vec<String> = status
            .fields
            .iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect();
        info!("Status: {}", fields.join(" "));
    }
}

/// Render epoch seconds as local wall-clock time
pub fn format_timestamp(seconds: f64) -> String {
    let micros = (seconds * 1_000_000.0) as i64;
    match chrono::DateTime::<chrono::Utc>::from_timestamp_micros(micros) {
        Some(time) => time.with_timezone(&chrono::Local).format("%H:%M:%S%.3f").to_string(),
        None => format!("{:.3}", seconds),
    }
}

/// Periodic poller driving the connection state machine
pub struct StatusPoller {
    channel: Arc<dyn CommandChannel>,
    interval: Duration,
    state: watch::Sender<ConnectionState>,
    observer: Box<dyn PollObserver>,
    cancel: CancellationToken,
}

impl StatusPoller {
    /// Create a poller in the `Connected` state
    pub fn new(channel: Arc<dyn CommandChannel>, interval: Duration, observer: Box<dyn PollObserver>) -> Self {
        let (state, _) = watch::channel(ConnectionState::Connected);
        Self {
            channel,
            interval,
            state,
            observer,
            cancel: CancellationToken::new(),
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Watch state changes
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run one poll cycle and return the resulting state
    ///
    /// If the poller was stopped while a request was in flight, the result
    /// is discarded and the state is left alone.
    pub async fn tick(&mut self) -> ConnectionState {
        if self.state() == ConnectionState::Disconnected {
            self.transition(ConnectionState::Reconnecting);
        }
        let previous = self.state();

        let log = self.channel.poll_log().await;
        if self.cancel.is_cancelled() {
            debug!("Poller stopped, discarding console poll result");
            return self.state();
        }

        match log {
            Err(e) => {
                if previous == ConnectionState::Connected {
                    warn!("Console poll failed: {}", e);
                    self.observer.on_disconnected();
                } else {
                    debug!("Bridge still unreachable: {}", e);
                }
                self.transition(ConnectionState::Disconnected);
            }
            Ok(entries) => {
                self.transition(ConnectionState::Connected);
                if previous != ConnectionState::Connected {
                    self.observer.on_reconnected();
                }

                if let Some(entries) = entries.filter(|entries| !entries.is_empty()) {
                    self.observer.on_log(&entries);
                }

                let status = self.channel.poll_status().await;
                if self.cancel.is_cancelled() {
                    debug!("Poller stopped, discarding status poll result");
                    return self.state();
                }

                match status {
                    Ok(Some(snapshot)) => self.observer.on_status(&snapshot),
                    Ok(None) => trace!("No status available"),
                    Err(e) => debug!("Status poll failed: {}", e),
                }
            }
        }

        self.state()
    }

    /// Move the poller onto its own task
    ///
    /// The first tick runs one interval after spawning. Ticks never overlap:
    /// the next sleep starts after the previous tick has finished.
    pub fn spawn(mut self) -> PollerHandle {
        let cancel = self.cancel.clone();
        let state = self.subscribe();

        let task = tokio::spawn(async move {
            info!("Status poller started (every {} ms)", self.interval.as_millis());

            loop {
                tokio::select! {
                    _ = self.cancel.cancelled() => break,
                    _ = tokio::time::sleep(self.interval) => {}
                }
                self.tick().await;
            }

            info!("Status poller stopped");
        });

        PollerHandle { cancel, state, task }
    }

    fn transition(&mut self, to: ConnectionState) {
        let from = self.state();
        if from == to {
            return;
        }

        self.state.send_replace(to);
        debug!("Connection state {} -> {}", from, to);
        self.observer.on_transition(from, to);
    }
}

/// Handle to a running poller task
pub struct PollerHandle {
    cancel: CancellationToken,
    state: watch::Receiver<ConnectionState>,
    task: JoinHandle<()>,
}

impl PollerHandle {
    /// Stop polling; an in-flight request completes but is ignored
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Wait for the task to exit (call `stop` first)
    pub async fn join(self) {
        if let Err(e) = self.task.await {
            warn!("Status poller task failed: {}", e);
        }
    }
}
