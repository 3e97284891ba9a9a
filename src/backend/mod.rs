//! Input and render capabilities
//!
//! The sampler never talks to a gamepad API or a display directly. It reads
//! axes through an [`InputSource`] and reports positions through a
//! [`RenderSink`], both injected by the caller.

pub mod mock_input;
pub mod mock_render;
#[cfg(feature = "gamepad")]
pub mod gamepad;

pub use mock_input::MockInputSource;
pub use mock_render::{LogRenderSink, MockRenderSink};
#[cfg(feature = "gamepad")]
pub use gamepad::GamepadSource;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Input backend failed: {0}")]
    Operation(String),

    #[error("Platform not supported")]
    PlatformNotSupported,
}

/// Raw axis pair for one device in one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AxisSample {
    pub x: f64,
    pub y: f64,
}

impl AxisSample {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Source of raw analog samples, polled once per tick
pub trait InputSource {
    /// Current axis pair for every connected device, keyed by device index
    fn poll(&mut self) -> Vec<(usize, AxisSample)>;
}

/// Receiver of filtered positions, notified whenever commands go out
pub trait RenderSink {
    fn on_position_update(&mut self, x: f64, y: f64);
}

impl<T: InputSource + ?Sized> InputSource for Box<T> {
    fn poll(&mut self) -> Vec<(usize, AxisSample)> {
        (**self).poll()
    }
}

impl<T: RenderSink + ?Sized> RenderSink for Box<T> {
    fn on_position_update(&mut self, x: f64, y: f64) {
        (**self).on_position_update(x, y)
    }
}

/// Get the default input source for the current build
#[cfg(feature = "gamepad")]
pub fn get_input_source() -> Result<Box<dyn InputSource>, BackendError> {
    Ok(Box::new(GamepadSource::new()?))
}

#[cfg(not(feature = "gamepad"))]
pub fn get_input_source() -> Result<Box<dyn InputSource>, BackendError> {
    Err(BackendError::PlatformNotSupported)
}

/// Get a mock input source with no devices attached
pub fn get_mock_input_source() -> MockInputSource {
    MockInputSource::new()
}
