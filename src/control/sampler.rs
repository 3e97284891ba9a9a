//! Input sampler - turns raw stick positions into motion commands
//!
//! Called once per frame. Each device gets its own pair of filters and its own
//! "last emitted" position, so a pad that is not moving never re-transmits.

use crate::backend::{AxisSample, InputSource, RenderSink};
use crate::config::InputConfig;
use crate::control::command::{Command, MOTOR_X, MOTOR_Y};
use crate::control::filter::{FilterError, FilterParams, SignalFilter};
use log::{debug, info, trace};
use std::collections::BTreeMap;

/// Settings for the sampler (deadband, scaling, gains, filters)
#[derive(Debug, Clone, PartialEq)]
pub struct SamplerSettings {
    /// Minimum per-axis change of the filtered value before commands go out
    pub threshold: f64,

    /// Multiplier applied to raw device axes before filtering
    pub axis_scale: f64,

    /// Gain turning filtered X into a motor value
    pub gain_x: f64,

    /// Gain turning filtered Y into a motor value
    pub gain_y: f64,

    /// Opcode used for emitted commands
    pub motion_opcode: u8,

    pub filter_x: FilterParams,
    pub filter_y: FilterParams,
}

impl Default for SamplerSettings {
    fn default() -> Self {
        Self::from(&InputConfig::default())
    }
}

impl From<&InputConfig> for SamplerSettings {
    fn from(config: &InputConfig) -> Self {
        Self {
            threshold: config.threshold,
            axis_scale: config.axis_scale,
            gain_x: config.gain_x,
            gain_y: config.gain_y,
            motion_opcode: config.motion_opcode,
            filter_x: config.filter_x,
            filter_y: config.filter_y,
        }
    }
}

/// Filter state and last transmitted position for one device
#[derive(Debug, Clone)]
struct AxisTrack {
    filter_x: SignalFilter,
    filter_y: SignalFilter,
    last_emitted: (f64, f64),
}

/// Samples every connected device and emits throttled motion commands
pub struct InputSampler {
    settings: SamplerSettings,
    /// Unprimed filter pair cloned for each new device
    prototype: AxisTrack,
    tracks: BTreeMap<usize, AxisTrack>,
}

impl InputSampler {
    /// Create a sampler; fails when either axis has unusable filter parameters
    pub fn new(settings: SamplerSettings) -> Result<Self, FilterError> {
        let prototype = AxisTrack {
            filter_x: SignalFilter::new(settings.filter_x)?,
            filter_y: SignalFilter::new(settings.filter_y)?,
            last_emitted: (0.0, 0.0),
        };

        debug!("Input sampler ready: {:?}", settings);

        Ok(Self {
            settings,
            prototype,
            tracks: BTreeMap::new(),
        })
    }

    pub fn settings(&self) -> &SamplerSettings {
        &self.settings
    }

    /// Number of devices currently tracked
    pub fn tracked_devices(&self) -> usize {
        self.tracks.len()
    }

    /// Run one tick: poll the source, filter, and return commands to send.
    ///
    /// Devices are handled in index order. Tracks for devices that were not
    /// reported this tick are dropped.
    pub fn tick<S, R>(&mut self, source: &mut S, sink: &mut R) -> Vec<Command>
    where
        S: InputSource + ?Sized,
        R: RenderSink + ?Sized,
    {
        let mut samples = source.poll();
        samples.sort_by_key(|(index, _)| *index);

        let before = self.tracks.len();
        self.tracks
            .retain(|index, _| samples.iter().any(|(seen, _)| seen == index));
        if self.tracks.len() != before {
            info!("Dropped filter state for {} disconnected device(s)", before - self.tracks.len());
        }

        let mut commands = Vec::new();
        for (index, sample) in samples {
            if let Some(emitted) = self.process(index, sample) {
                let (fx, fy) = self.tracks[&index].last_emitted;
                sink.on_position_update(fx, fy);
                commands.extend(emitted);
            }
        }

        commands
    }

    /// Filter one device sample; returns the X and Y commands when the change
    /// exceeds the deadband on either axis.
    pub fn process(&mut self, device: usize, sample: AxisSample) -> Option<[Command; 2]> {
        let settings = &self.settings;
        let track = self
            .tracks
            .entry(device)
            .or_insert_with(|| self.prototype.clone());

        let fx = track.filter_x.filter(sample.x * settings.axis_scale);
        let fy = track.filter_y.filter(sample.y * settings.axis_scale);

        let (last_x, last_y) = track.last_emitted;
        if (fx - last_x).abs() <= settings.threshold && (fy - last_y).abs() <= settings.threshold {
            trace!("Device {} within deadband: ({:.4}, {:.4})", device, fx, fy);
            return None;
        }

        track.last_emitted = (fx, fy);

        let commands = [
            Command::new(settings.motion_opcode, MOTOR_X, scale_to_int(fx, settings.gain_x)),
            Command::new(settings.motion_opcode, MOTOR_Y, scale_to_int(fy, settings.gain_y)),
        ];

        debug!(
            "Device {}: filtered ({:.3}, {:.3}) prev ({:.3}, {:.3}) -> {} / {}",
            device, fx, fy, last_x, last_y, commands[0], commands[1]
        );

        Some(commands)
    }
}

/// Scale and round to the nearest integer, saturating at the i32 range
fn scale_to_int(value: f64, gain: f64) -> i32 {
    (value * gain).round() as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MockInputSource, MockRenderSink};
    use crate::control::command::MOTION;

    fn unit_settings() -> SamplerSettings {
        SamplerSettings {
            threshold: 0.02,
            axis_scale: 1.0,
            gain_x: 50.0,
            gain_y: 5.0,
            motion_opcode: MOTION,
            filter_x: FilterParams::default(),
            filter_y: FilterParams::default(),
        }
    }

    #[test]
    fn test_no_devices_is_noop() {
        let mut sampler = InputSampler::new(unit_settings()).unwrap();
        let mut source = MockInputSource::new();
        let mut sink = MockRenderSink::new();

        assert!(sampler.tick(&mut source, &mut sink).is_empty());
        assert!(sink.positions().is_empty());
        assert_eq!(source.poll_count(), 1);
    }

    #[test]
    fn test_first_movement_emits_both_axes() {
        let mut sampler = InputSampler::new(unit_settings()).unwrap();
        let commands = sampler.process(0, AxisSample::new(0.5, -0.4)).unwrap();

        assert_eq!(commands[0], Command::new(MOTION, MOTOR_X, 25));
        assert_eq!(commands[1], Command::new(MOTION, MOTOR_Y, -2));
    }

    #[test]
    fn test_rest_position_is_silent() {
        let mut sampler = InputSampler::new(unit_settings()).unwrap();
        assert!(sampler.process(0, AxisSample::new(0.0, 0.01)).is_none());
    }

    #[test]
    fn test_deadband_suppresses_repeat() {
        let mut sampler = InputSampler::new(unit_settings()).unwrap();
        let mut source = MockInputSource::new();
        let mut sink = MockRenderSink::new();

        source.set_device(0, 0.6, 0.3);
        assert_eq!(sampler.tick(&mut source, &mut sink).len(), 2);

        // Constant input keeps the filtered pair unchanged
        assert!(sampler.tick(&mut source, &mut sink).is_empty());
        assert_eq!(sink.positions().len(), 1);
    }

    #[test]
    fn test_small_change_within_deadband() {
        let mut sampler = InputSampler::new(unit_settings()).unwrap();
        assert!(sampler.process(0, AxisSample::new(0.6, 0.3)).is_some());

        // A raw change of 0.02 moves the filtered value by less than that
        assert!(sampler.process(0, AxisSample::new(0.62, 0.3)).is_none());
    }

    #[test]
    fn test_deadband_trigger_value() {
        let settings = unit_settings();
        let mut sampler = InputSampler::new(settings.clone()).unwrap();
        let mut reference = SignalFilter::new(settings.filter_x).unwrap();

        sampler.process(0, AxisSample::new(0.2, 0.3)).unwrap();
        reference.filter(0.2);

        let commands = sampler.process(0, AxisSample::new(0.8, 0.3)).unwrap();
        let expected = reference.filter(0.8);

        let x_commands: Vec<_> = commands.iter().filter(|c| c.motor == MOTOR_X).collect();
        assert_eq!(x_commands.len(), 1);
        assert_eq!(x_commands[0].value, (expected * settings.gain_x).round() as i32);
    }

    #[test]
    fn test_render_sink_gets_filtered_position() {
        let mut sampler = InputSampler::new(unit_settings()).unwrap();
        let mut source = MockInputSource::new();
        let mut sink = MockRenderSink::new();

        source.set_device(0, 0.5, 0.5);
        sampler.tick(&mut source, &mut sink);

        assert_eq!(sink.last(), Some((0.5, 0.5)));
    }

    #[test]
    fn test_devices_filtered_independently() {
        let mut sampler = InputSampler::new(unit_settings()).unwrap();
        let mut source = MockInputSource::new();
        let mut sink = MockRenderSink::new();

        source.set_device(0, 0.5, 0.0);
        source.set_device(3, -0.5, 0.0);

        let commands = sampler.tick(&mut source, &mut sink);
        assert_eq!(commands.len(), 4);
        assert_eq!(commands[0].value, 25);
        assert_eq!(commands[2].value, -25);
        assert_eq!(sampler.tracked_devices(), 2);

        // Moving device 3 leaves device 0 silent
        source.set_device(3, 0.5, 0.0);
        let commands = sampler.tick(&mut source, &mut sink);
        assert_eq!(commands.len(), 2);
    }

    #[test]
    fn test_disconnected_device_dropped() {
        let mut sampler = InputSampler::new(unit_settings()).unwrap();
        let mut source = MockInputSource::new();
        let mut sink = MockRenderSink::new();

        source.set_device(1, 0.5, 0.5);
        sampler.tick(&mut source, &mut sink);
        assert_eq!(sampler.tracked_devices(), 1);

        source.remove_device(1);
        sampler.tick(&mut source, &mut sink);
        assert_eq!(sampler.tracked_devices(), 0);

        // Reconnecting starts from a fresh filter
        source.set_device(1, 0.5, 0.5);
        let commands = sampler.tick(&mut source, &mut sink);
        assert_eq!(commands[0].value, 25);
    }

    #[test]
    fn test_axis_scale_applied_before_filtering() {
        let settings = SamplerSettings { axis_scale: 100.0, ..unit_settings() };
        let mut sampler = InputSampler::new(settings).unwrap();

        let commands = sampler.process(0, AxisSample::new(0.1, -0.1)).unwrap();
        assert_eq!(commands[0].value, 500);
        assert_eq!(commands[1].value, -50);
    }

    #[test]
    fn test_value_saturates() {
        let settings = SamplerSettings { gain_x: 1e12, ..unit_settings() };
        let mut sampler = InputSampler::new(settings).unwrap();

        let commands = sampler.process(0, AxisSample::new(1.0, 0.0)).unwrap();
        assert_eq!(commands[0].value, i32::MAX);
    }

    #[test]
    fn test_invalid_filter_rejected() {
        let mut settings = unit_settings();
        settings.filter_y.c = 0.0;
        assert!(InputSampler::new(settings).is_err());
    }
}
