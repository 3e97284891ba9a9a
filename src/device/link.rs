//! Serial link to the motor controller
//!
//! A [`DeviceLink`] owns the one serial connection to the controller. Writes
//! are synchronous and do not wait for the device to act on the command. A
//! reader thread splits incoming bytes into lines: status frames replace the
//! current [`StatusSnapshot`], everything else lands in the console buffer.
//!
//! The link never reopens itself. Once a write fails or the port closes it
//! stays unavailable until the bridge process is restarted.

use crate::config::SerialConfig;
use crate::control::command::Command;
use crate::device::frame::{self, WireFormat};
use crate::device::types::{LogEntry, StatusSnapshot};
use crate::device::DeviceError;
use log::{debug, error, info, trace, warn};
use serialport::SerialPortType;
use std::collections::VecDeque;
use std::io::{BufRead, BufReader, ErrorKind, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Lock a mutex, recovering the data if a holder panicked
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Bounded, ordered console buffer; oldest entries go first when full
#[derive(Debug)]
struct LogBuffer {
    entries: VecDeque<LogEntry>,
    capacity: usize,
    dropped: u64,
}

impl LogBuffer {
    fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(1024)),
            capacity: capacity.max(1),
            dropped: 0,
        }
    }

    fn push(&mut self, entry: LogEntry) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
            self.dropped += 1;
        }
        self.entries.push_back(entry);
    }

    fn drain(&mut self) -> Vec<LogEntry> {
        self.entries.drain(..).collect()
    }
}

/// State shared between the link and its reader thread
struct LinkShared {
    log: Mutex<LogBuffer>,
    status: Mutex<Option<StatusSnapshot>>,
    healthy: AtomicBool,
    running: AtomicBool,
}

impl LinkShared {
    fn on_line(&self, raw: &[u8]) {
        let line = frame::trim_line(raw);
        if line.is_empty() {
            return;
        }

        if frame::is_status_frame(line) {
            match frame::parse_status_frame(line) {
                Ok(snapshot) => {
                    trace!("Status frame: {:?}", snapshot);
                    *lock(&self.status) = Some(snapshot);
                }
                Err(e) => warn!("Discarding status frame: {}", e),
            }
            return;
        }

        let text = String::from_utf8_lossy(line).into_owned();
        debug!("Device: {}", text);
        lock(&self.log).push(LogEntry::now(text));
    }

    fn mark_unavailable(&self, reason: &str) {
        if self.healthy.swap(false, Ordering::SeqCst) {
            warn!("Device link unavailable: {}", reason);
            lock(&self.log).push(LogEntry::now(format!("Device link lost: {}", reason)));
        }
    }
}

/// Exclusive connection to one controller
pub struct DeviceLink {
    name: String,
    format: WireFormat,
    writer: Mutex<Option<Box<dyn Write + Send>>>,
    shared: Arc<LinkShared>,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl DeviceLink {
    /// Open the configured serial port and start reading from it
    pub fn open(config: &SerialConfig, log_capacity: usize) -> Result<Self, DeviceError> {
        let path = resolve_port(config)?;
        info!("Opening {} at {} baud", path, config.baud_rate);

        let port = serialport::new(&path, config.baud_rate)
            .timeout(Duration::from_millis(config.read_timeout_ms))
            .open()?;

        // Start from a clean line in both directions
        if let Err(e) = port.clear(serialport::ClearBuffer::All) {
            debug!("Could not clear serial buffers: {}", e);
        }

        let reader = port.try_clone()?;
        let link = Self::with_io(path.clone(), port, Some(reader), config.wire_format, log_capacity)?;

        link.note(format!("Device found at port {}", path));
        info!("✓ Device link open on {}", path);
        Ok(link)
    }

    /// Open the configured port, retrying discovery until it succeeds or
    /// `cancelled` becomes true
    pub fn open_with_retry(
        config: &SerialConfig,
        log_capacity: usize,
        cancelled: &AtomicBool,
    ) -> Result<Self, DeviceError> {
        let retry = Duration::from_secs(config.discovery_retry_secs.max(1));

        loop {
            match Self::open(config, log_capacity) {
                Ok(link) => return Ok(link),
                Err(DeviceError::NotFound(what)) => {
                    warn!(
                        "UART target device not found ({}). Retrying in {}s...",
                        what,
                        retry.as_secs()
                    );
                }
                Err(e) => return Err(e),
            }

            let mut waited = Duration::ZERO;
            while waited < retry {
                if cancelled.load(Ordering::SeqCst) {
                    return Err(DeviceError::Unavailable("discovery cancelled".into()));
                }
                let step = Duration::from_millis(100);
                thread::sleep(step);
                waited += step;
            }
        }
    }

    /// Build a link over arbitrary I/O (simulators, tests)
    ///
    /// When a reader is supplied a thread feeds its lines to [`on_line`](Self::on_line);
    /// reaching end of stream marks the link unavailable.
    pub fn with_io<W, R>(
        name: impl Into<String>,
        writer: W,
        reader: Option<R>,
        format: WireFormat,
        log_capacity: usize,
    ) -> Result<Self, DeviceError>
    where
        W: Write + Send + 'static,
        R: Read + Send + 'static,
    {
        let mut link = Self::with_writer(name, writer, format, log_capacity);
        if let Some(reader) = reader {
            let handle = spawn_reader(&link.name, reader, Arc::clone(&link.shared))?;
            link.reader = Mutex::new(Some(handle));
        }
        Ok(link)
    }

    /// Build a link that only writes; incoming lines are fed by the caller
    pub fn with_writer<W>(name: impl Into<String>, writer: W, format: WireFormat, log_capacity: usize) -> Self
    where
        W: Write + Send + 'static,
    {
        let writer: Box<dyn Write + Send> = Box::new(writer);
        Self {
            name: name.into(),
            format,
            writer: Mutex::new(Some(writer)),
            shared: Arc::new(LinkShared {
                log: Mutex::new(LogBuffer::new(log_capacity)),
                status: Mutex::new(None),
                healthy: AtomicBool::new(true),
                running: AtomicBool::new(true),
            }),
            reader: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn format(&self) -> WireFormat {
        self.format
    }

    /// Whether the link can still accept writes
    pub fn is_healthy(&self) -> bool {
        self.shared.healthy.load(Ordering::SeqCst)
    }

    /// Encode and write one command
    pub fn write(&self, command: &Command) -> Result<(), DeviceError> {
        if !self.is_healthy() {
            return Err(DeviceError::Unavailable(format!("{} is not connected", self.name)));
        }

        let frame = self.format.encode(command);
        let mut writer = lock(&self.writer);
        let port = writer
            .as_mut()
            .ok_or_else(|| DeviceError::Unavailable(format!("{} is closed", self.name)))?;

        if let Err(e) = port.write_all(&frame).and_then(|_| port.flush()) {
            *writer = None;
            self.shared.mark_unavailable(&e.to_string());
            return Err(DeviceError::Unavailable(format!("write to {} failed: {}", self.name, e)));
        }

        trace!("Wrote {} -> {:02x?}", command, frame);
        Ok(())
    }

    /// Handle one line received from the device
    pub fn on_line(&self, line: &[u8]) {
        self.shared.on_line(line);
    }

    /// Append a bridge-originated notice to the console buffer
    pub fn note(&self, text: impl Into<String>) {
        lock(&self.shared.log).push(LogEntry::now(text));
    }

    /// Read and clear pending console entries, oldest first
    pub fn drain_log(&self) -> Vec<LogEntry> {
        let mut log = lock(&self.shared.log);
        if log.dropped > 0 {
            debug!("{} console entries dropped since last drain", log.dropped);
            log.dropped = 0;
        }
        log.drain()
    }

    /// Most recent status snapshot from the device
    pub fn latest_status(&self) -> Option<StatusSnapshot> {
        lock(&self.shared.status).clone()
    }

    /// Stop the reader and release the port
    pub fn close(&self) {
        self.shared.running.store(false, Ordering::SeqCst);
        self.shared.healthy.store(false, Ordering::SeqCst);
        *lock(&self.writer) = None;

        if let Some(handle) = lock(&self.reader).take() {
            if handle.join().is_err() {
                error!("Reader thread for {} panicked", self.name);
            }
        }
        info!("Device link {} closed", self.name);
    }
}

impl Drop for DeviceLink {
    fn drop(&mut self) {
        if self.shared.running.load(Ordering::SeqCst) {
            self.close();
        }
    }
}

/// Spawn the thread that splits incoming bytes into lines
fn spawn_reader<R>(name: &str, reader: R, shared: Arc<LinkShared>) -> Result<JoinHandle<()>, DeviceError>
where
    R: Read + Send + 'static,
{
    let thread_name = format!("serial-reader-{}", name.rsplit('/').next().unwrap_or(name));
    let handle = thread::Builder::new().name(thread_name).spawn(move || {
        debug!("Serial reader started");
        let mut reader = BufReader::new(reader);
        let mut line = Vec::new();

        while shared.running.load(Ordering::SeqCst) {
            match reader.read_until(b'\n', &mut line) {
                Ok(0) => {
                    if !line.is_empty() {
                        shared.on_line(&line);
                    }
                    shared.mark_unavailable("port closed");
                    break;
                }
                // A newline within a status frame's floats is data
                Ok(_) if line.ends_with(b"\n") && !frame::line_complete(&line) => {}
                Ok(_) => {
                    let complete = line.ends_with(b"\n");
                    shared.on_line(&line);
                    line.clear();
                    if !complete {
                        shared.mark_unavailable("port closed");
                        break;
                    }
                }
                // Partial data stays in `line` until the newline arrives
                Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted) => {}
                Err(e) => {
                    error!("Serial read failed: {}", e);
                    shared.mark_unavailable(&e.to_string());
                    break;
                }
            }
        }

        debug!("Serial reader exited");
    })?;

    Ok(handle)
}

/// Resolve the port path: explicit path, or first USB port whose
/// product/manufacturer matches the configured description
pub fn resolve_port(config: &SerialConfig) -> Result<String, DeviceError> {
    if let Some(path) = &config.path {
        return Ok(path.clone());
    }

    let needle = config.match_description.to_lowercase();
    let mut ports = serialport::available_ports()?;
    ports.sort_by(|a, b| a.port_name.cmp(&b.port_name));

    for port in ports {
        if let SerialPortType::UsbPort(info) = &port.port_type {
            let description = [info.product.as_deref(), info.manufacturer.as_deref()]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>()
                .join(" ");
            debug!("Candidate port {}: {}", port.port_name, description);

            if description.to_lowercase().contains(&needle) {
                info!("Found '{}' at {}", description, port.port_name);
                return Ok(port.port_name);
            }
        }
    }

    Err(DeviceError::NotFound(config.match_description.clone()))
}
