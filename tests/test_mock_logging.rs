//! Test to verify the logging sinks and observers emit without a display

use roverlink::backend::{LogRenderSink, RenderSink};
use roverlink::device::{LogEntry, StatusSnapshot};
use roverlink::poller::{LogObserver, PollObserver};

fn init_logger() {
    let _ = env_logger::builder()
        .is_test(true)
        .filter_level(log::LevelFilter::Debug)
        .try_init();
}

#[test]
fn test_log_render_sink_logs() {
    init_logger();

    let mut sink = LogRenderSink;
    sink.on_position_update(12.5, -3.0);
}

#[test]
fn test_log_observer_logs() {
    init_logger();

    let mut observer = LogObserver;
    observer.on_disconnected();
    observer.on_reconnected();
    observer.on_log(&[LogEntry::now("Device found at port /dev/ttyACM0"), LogEntry::new(0.0, "boot")]);
    observer.on_status(&StatusSnapshot::new().with("DEGX", 1.5).with("message", "ok"));
}
