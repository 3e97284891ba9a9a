//! The shipped configuration file matches the built-in defaults

use roverlink::config::Config;
use roverlink::device::WireFormat;
use std::io::Write;

#[test]
fn test_shipped_config_matches_defaults() {
    let config = Config::load_default().unwrap();
    assert_eq!(config, Config::default());
    assert_eq!(config.serial.wire_format, WireFormat::Text);
    assert_eq!(config.client.poll_interval_ms, 2000);
}

#[test]
fn test_partial_file_overrides() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[serial]
path = "/dev/ttyUSB1"
wire_format = "packed"

[input]
threshold = 0.5
"#
    )
    .unwrap();

    let config = Config::load(file.path()).unwrap();
    assert_eq!(config.serial.path.as_deref(), Some("/dev/ttyUSB1"));
    assert_eq!(config.serial.wire_format, WireFormat::Packed);
    assert_eq!(config.input.threshold, 0.5);
    assert_eq!(config.bridge, Config::default().bridge);
}

#[test]
fn test_shipped_config_switches_to_packed() {
    let shipped = std::fs::read_to_string("configs/default.toml").unwrap();
    assert!(shipped.contains("stock controller firmware parses"));

    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{}", shipped.replace(r#"wire_format = "text""#, r#"wire_format = "packed""#)).unwrap();

    let config = Config::load(file.path()).unwrap();
    assert_eq!(config.serial.wire_format, WireFormat::Packed);
    assert_eq!(config.client, Config::default().client);
}
