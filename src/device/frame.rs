//! Serial wire frames
//!
//! Outgoing commands are encoded in one of two formats:
//! - `text`: `"<command> <motor> <value>\n"`, ASCII decimal
//! - `packed`: 8 bytes big-endian, `u8 command, u8 motor, i32 value, u16 0xFFFF`
//!
//! Incoming lines starting with [`STATUS_START_BYTE`] are binary status
//! frames; everything else is console text.

use crate::control::command::Command;
use crate::device::types::{StatusSnapshot, StatusValue};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// First byte of a binary status frame
pub const STATUS_START_BYTE: u8 = 0xFF;

/// Length of the structured part of a status frame
pub const STATUS_FRAME_LEN: usize = 29;

/// Length of a packed command frame
pub const PACKED_FRAME_LEN: usize = 8;

/// Trailer of a packed command frame
pub const PACKED_TERMINATOR: u16 = 0xFFFF;

/// Names of the six float fields of a status frame, in wire order
pub const STATUS_FLOAT_FIELDS: [&str; 6] = ["DEGX", "DEGY", "VELX", "VELY", "DEZX", "DEZY"];

#[derive(Debug, Error, PartialEq)]
pub enum FrameError {
    #[error("Status frame too short: {0} bytes (need 29)")]
    TooShort(usize),

    #[error("Not a status frame (start byte 0x{0:02x})")]
    NotStatus(u8),
}

/// Command encoding agreed with the controller firmware
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireFormat {
    #[default]
    Text,
    Packed,
}

impl WireFormat {
    /// Encode one command into a complete frame
    pub fn encode(&self, command: &Command) -> Vec<u8> {
        match self {
            WireFormat::Text => {
                format!("{} {} {}\n", command.command, command.motor, command.value).into_bytes()
            }
            WireFormat::Packed => {
                let mut frame = Vec::with_capacity(PACKED_FRAME_LEN);
                frame.push(command.command);
                frame.push(command.motor);
                frame.extend_from_slice(&command.value.to_be_bytes());
                frame.extend_from_slice(&PACKED_TERMINATOR.to_be_bytes());
                frame
            }
        }
    }

    /// Decode one frame; `None` when it is not a well-formed command
    pub fn decode(&self, frame: &[u8]) -> Option<Command> {
        match self {
            WireFormat::Text => {
                let text = std::str::from_utf8(frame).ok()?;
                let mut parts = text.trim_end_matches(['\r', '\n']).split(' ');
                let command = parts.next()?.parse().ok()?;
                let motor = parts.next()?.parse().ok()?;
                let value = parts.next()?.parse().ok()?;
                if parts.next().is_some() {
                    return None;
                }
                Some(Command::new(command, motor, value))
            }
            WireFormat::Packed => {
                if frame.len() != PACKED_FRAME_LEN || frame[6..8] != PACKED_TERMINATOR.to_be_bytes() {
                    return None;
                }
                let value = i32::from_be_bytes([frame[2], frame[3], frame[4], frame[5]]);
                Some(Command::new(frame[0], frame[1], value))
            }
        }
    }

    /// Decode a byte stream of back-to-back frames, skipping malformed ones
    pub fn decode_all(&self, bytes: &[u8]) -> Vec<Command> {
        match self {
            WireFormat::Text => bytes
                .split(|b| *b == b'\n')
                .filter(|line| !line.is_empty())
                .filter_map(|line| self.decode(line))
                .collect(),
            WireFormat::Packed => bytes
                .chunks(PACKED_FRAME_LEN)
                .filter_map(|chunk| self.decode(chunk))
                .collect(),
        }
    }
}

/// Strip a trailing `\n` or `\r\n`
///
/// A `\r` inside the fixed part of a status frame is data and is kept.
pub fn trim_line(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    if is_status_frame(line) && line.len() <= STATUS_FRAME_LEN {
        return line;
    }
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// Check whether bytes read up to a newline form a whole line
///
/// Status frames carry raw floats, so a `\n` inside the fixed part does not
/// end the frame.
pub fn line_complete(line: &[u8]) -> bool {
    line.ends_with(b"\n") && (!is_status_frame(line) || line.len() > STATUS_FRAME_LEN)
}

/// Check whether an incoming line carries a status frame
pub fn is_status_frame(line: &[u8]) -> bool {
    line.first() == Some(&STATUS_START_BYTE)
}

/// Parse a binary status frame into a snapshot
///
/// Layout (big-endian): `u8 start, i32 control_mode, f32 x6`, then optional
/// UTF-8 text which becomes the `message` field.
pub fn parse_status_frame(frame: &[u8]) -> Result<StatusSnapshot, FrameError> {
    match frame.first() {
        Some(&STATUS_START_BYTE) => {}
        Some(&other) => return Err(FrameError::NotStatus(other)),
        None => return Err(FrameError::TooShort(0)),
    }

    if frame.len() < STATUS_FRAME_LEN {
        return Err(FrameError::TooShort(frame.len()));
    }

    let control_mode = i32::from_be_bytes([frame[1], frame[2], frame[3], frame[4]]);

    let mut snapshot = StatusSnapshot::new()
        .with("startByte", frame[0] as f64)
        .with("controlMode", control_mode as f64);

    for (i, name) in STATUS_FLOAT_FIELDS.iter().enumerate() {
        let at = 5 + i * 4;
        let value = f32::from_be_bytes([frame[at], frame[at + 1], frame[at + 2], frame[at + 3]]);
        snapshot.fields.insert(name.to_string(), StatusValue::Number(value as f64));
    }

    let message = String::from_utf8_lossy(&frame[STATUS_FRAME_LEN..]);
    let message = message.trim_end();
    if !message.is_empty() {
        snapshot.fields.insert("message".to_string(), StatusValue::Text(message.to_string()));
    }

    Ok(snapshot)
}

/// Build a status frame (controller side); used by simulators and tests
pub fn build_status_frame(control_mode: i32, values: [f32; 6], message: &str) -> Vec<u8> {
    let mut frame = Vec::with_capacity(STATUS_FRAME_LEN + message.len());
    frame.push(STATUS_START_BYTE);
    frame.extend_from_slice(&control_mode.to_be_bytes());
    for value in values {
        frame.extend_from_slice(&value.to_be_bytes());
    }
    frame.extend_from_slice(message.as_bytes());
    frame
}
