//! Integration tests for the mock input and render backends

use roverlink::backend::{get_mock_input_source, AxisSample, InputSource, MockInputSource, MockRenderSink, RenderSink};
use roverlink::control::command::{MOTION, MOTOR_X, MOTOR_Y};
use roverlink::control::{InputSampler, SamplerSettings};

#[test]
fn test_mock_input_source() {
    let mut source = get_mock_input_source();
    assert!(source.poll().is_empty());

    source.set_device(1, 0.25, -0.5);
    assert_eq!(source.poll(), vec![(1, AxisSample::new(0.25, -0.5))]);

    source.remove_device(1);
    assert!(source.poll().is_empty());
    assert_eq!(source.poll_count(), 3);
}

#[test]
fn test_mock_render_sink_is_shared() {
    let sink = MockRenderSink::new();
    let mut boxed: Box<dyn RenderSink> = Box::new(sink.clone());

    boxed.on_position_update(1.0, 2.0);
    boxed.on_position_update(3.0, 4.0);

    assert_eq!(sink.positions(), vec![(1.0, 2.0), (3.0, 4.0)]);
    assert_eq!(sink.last(), Some((3.0, 4.0)));
}

#[test]
fn test_sampler_over_mock_backends() {
    let mut sampler = InputSampler::new(SamplerSettings::default()).unwrap();
    let mut source = MockInputSource::new();
    let mut sink = MockRenderSink::new();

    // Stick centered: filtered value stays at zero, nothing to send
    source.set_device(0, 0.0, 0.0);
    assert!(sampler.tick(&mut source, &mut sink).is_empty());

    // Push the stick: both motors get a command and the sink sees the position
    source.set_device(0, 0.5, 0.0);
    let commands = sampler.tick(&mut source, &mut sink);
    assert_eq!(commands.len(), 2);
    assert!(commands.iter().all(|c| c.command == MOTION));
    assert_eq!(commands[0].motor, MOTOR_X);
    assert_eq!(commands[1].motor, MOTOR_Y);
    assert!(commands[0].value > 0);
    assert_eq!(sink.positions().len(), 1);

    let (x, _) = sink.last().unwrap();
    assert_eq!(commands[0].value, (x * 50.0).round() as i32);

    // Unplugging the pad forgets its filters
    source.remove_device(0);
    assert!(sampler.tick(&mut source, &mut sink).is_empty());
    assert_eq!(sampler.tracked_devices(), 0);
}
