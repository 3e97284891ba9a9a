//! Mock serial port for testing.
//!
//! Captures every byte written by a [`DeviceLink`](super::DeviceLink) instead
//! of sending it to hardware, and can be told to fail writes to simulate an
//! unplugged controller.

use crate::control::command::Command;
use crate::device::frame::WireFormat;
use log::info;
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Mock serial writer; clones share the same capture buffer.
#[derive(Clone, Debug, Default)]
pub struct MockSerial {
    written: Arc<Mutex<Vec<u8>>>,
    fail: Arc<AtomicBool>,
}

impl MockSerial {
    /// Create a new mock serial port.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent writes fail (or succeed again).
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Raw bytes written so far.
    pub fn written(&self) -> Vec<u8> {
        self.written.lock().map(|w| w.clone()).unwrap_or_default()
    }

    /// Commands written so far, decoded with the given format.
    pub fn commands(&self, format: WireFormat) -> Vec<Command> {
        format.decode_all(&self.written())
    }
}

impl Write for MockSerial {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "mock serial unplugged"));
        }
        info!("[MOCK SERIAL] Write {} bytes: {:02x?}", buf.len(), buf);
        self.written
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "mock serial poisoned"))?
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
