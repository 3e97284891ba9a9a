//! Command wire unit
//!
//! A [`Command`] is what travels from the operator to the bridge and from the
//! bridge to the controller firmware. It is immutable once built.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opcode asking the controller to emit a status frame
pub const STATUS_REQUEST: u8 = 1;

/// Opcode for motion setpoints (one command per motor)
pub const MOTION: u8 = 6;

/// Motor index driven by the X axis
pub const MOTOR_X: u8 = 0;

/// Motor index driven by the Y axis
pub const MOTOR_Y: u8 = 1;

/// One unit of control intent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Command {
    /// Opcode selecting the controller subsystem
    pub command: u8,

    /// Actuator index
    pub motor: u8,

    /// Signed magnitude
    pub value: i32,
}

impl Command {
    pub const fn new(command: u8, motor: u8, value: i32) -> Self {
        Self { command, motor, value }
    }

    /// Motion setpoint for a motor
    pub const fn motion(motor: u8, value: i32) -> Self {
        Self::new(MOTION, motor, value)
    }

    /// Request for a fresh status frame
    pub const fn status_request() -> Self {
        Self::new(STATUS_REQUEST, 0, 0)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cmd={} motor={} value={}", self.command, self.motor, self.value)
    }
}
