//! Render sinks that do not draw anything.
//!
//! [`MockRenderSink`] records every position it receives so tests can check
//! what would have been drawn. [`LogRenderSink`] logs positions instead, which
//! is what the operator binary uses when no display is attached.

use super::RenderSink;
use log::debug;
use std::sync::{Arc, Mutex};

/// Render sink that records positions; clones share the same record.
#[derive(Clone, Debug, Default)]
pub struct MockRenderSink {
    positions: Arc<Mutex<Vec<(f64, f64)>>>,
}

impl MockRenderSink {
    /// Create a new recording sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// All positions received so far.
    pub fn positions(&self) -> Vec<(f64, f64)> {
        self.positions.lock().map(|p| p.clone()).unwrap_or_default()
    }

    /// Most recent position, if any.
    pub fn last(&self) -> Option<(f64, f64)> {
        self.positions.lock().ok().and_then(|p| p.last().copied())
    }
}

impl RenderSink for MockRenderSink {
    fn on_position_update(&mut self, x: f64, y: f64) {
        if let Ok(mut positions) = self.positions.lock() {
            positions.push((x, y));
        }
    }
}

/// Render sink that logs positions at debug level.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogRenderSink;

impl RenderSink for LogRenderSink {
    fn on_position_update(&mut self, x: f64, y: f64) {
        debug!("Position: x={:.3}, y={:.3}", x, y);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_render_records_shared() {
        let sink = MockRenderSink::new();
        let mut handle = sink.clone();

        handle.on_position_update(1.0, 2.0);
        handle.on_position_update(-3.0, 4.5);

        assert_eq!(sink.positions(), vec![(1.0, 2.0), (-3.0, 4.5)]);
        assert_eq!(sink.last(), Some((-3.0, 4.5)));
    }

    #[test]
    fn log_render_accepts_anything() {
        let mut sink = LogRenderSink;
        sink.on_position_update(f64::NAN, 0.0);
    }
}
