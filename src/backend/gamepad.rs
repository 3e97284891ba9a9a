//! Physical gamepad input via gilrs.
//!
//! Reads the left stick of every connected pad. gilrs reports positive Y as
//! "up"; the operator convention is positive Y "down", so Y is negated here.

use super::{AxisSample, BackendError, InputSource};
use gilrs::{Axis, EventType, Gilrs};
use log::{debug, info};

/// Gamepad input source backed by gilrs
pub struct GamepadSource {
    gilrs: Gilrs,
}

impl GamepadSource {
    pub fn new() -> Result<Self, BackendError> {
        let gilrs = Gilrs::new().map_err(|e| BackendError::Operation(e.to_string()))?;

        for (id, pad) in gilrs.gamepads() {
            info!("Found gamepad {}: {}", usize::from(id), pad.name());
        }

        Ok(Self { gilrs })
    }
}

impl InputSource for GamepadSource {
    fn poll(&mut self) -> Vec<(usize, AxisSample)> {
        // Drain pending events so cached axis values are current
        while let Some(event) = self.gilrs.next_event() {
            match event.event {
                EventType::Connected => info!("Gamepad {} connected", usize::from(event.id)),
                EventType::Disconnected => info!("Gamepad {} disconnected", usize::from(event.id)),
                _ => {}
            }
        }

        let mut samples: Vec<(usize, AxisSample)> = self
            .gilrs
            .gamepads()
            .filter(|(_, pad)| pad.is_connected())
            .map(|(id, pad)| {
                let x = pad.value(Axis::LeftStickX) as f64;
                let y = -(pad.value(Axis::LeftStickY) as f64);
                (usize::from(id), AxisSample::new(x, y))
            })
            .collect();

        samples.sort_by_key(|(index, _)| *index);
        debug!("Polled {} gamepad(s)", samples.len());
        samples
    }
}
