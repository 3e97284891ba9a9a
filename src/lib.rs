//! Roverlink: gamepad teleoperation bridge for a serial motor controller
//!
//! Operators sample a gamepad, smooth the sticks with a scalar Kalman filter
//! and send motion commands over HTTP to a bridge process. The bridge owns
//! the serial link to the controller, forwards commands, and serves the
//! controller's console output and status telemetry back to operators.

pub mod backend;
pub mod bridge;
pub mod channel;
pub mod config;
pub mod control;
pub mod device;
pub mod poller;

// Re-export commonly used items
pub use backend::{AxisSample, InputSource, RenderSink};
pub use bridge::{Bridge, BridgeServer};
pub use channel::{ChannelError, CommandChannel, HttpChannel, LoopbackChannel};
pub use config::Config;
pub use control::{Command, InputSampler, SignalFilter};
pub use device::{DeviceError, DeviceLink, LogEntry, StatusSnapshot, WireFormat};
pub use poller::{ConnectionState, PollObserver, StatusPoller};
