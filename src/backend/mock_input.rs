//! Mock input source for testing.
//!
//! Devices are plugged in and moved by hand. Every poll reports the current
//! position of each plugged device in device-index order, and logs it at
//! trace level.

use super::{AxisSample, InputSource};
use log::trace;
use std::collections::BTreeMap;

/// Mock input source with manually driven devices.
#[derive(Clone, Debug, Default)]
pub struct MockInputSource {
    devices: BTreeMap<usize, AxisSample>,
    polls: usize,
}

impl MockInputSource {
    /// Create a mock source with no devices attached.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a device, or move it if it is already attached.
    pub fn set_device(&mut self, index: usize, x: f64, y: f64) {
        self.devices.insert(index, AxisSample::new(x, y));
    }

    /// Detach a device.
    pub fn remove_device(&mut self, index: usize) {
        self.devices.remove(&index);
    }

    /// Number of times the source has been polled.
    pub fn poll_count(&self) -> usize {
        self.polls
    }
}

impl InputSource for MockInputSource {
    fn poll(&mut self) -> Vec<(usize, AxisSample)> {
        self.polls += 1;
        trace!("[MOCK INPUT] Poll #{}: {:?}", self.polls, self.devices);
        self.devices.iter().map(|(index, sample)| (*index, *sample)).collect()
    }
}
