#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

mod common;

use std::path::Path;

use soaptap_inspector::config::{self, keys, LayeredConfig, Settings, StaticSource};

use common::day;

#[test]
fn defaults_match_documented_values() {
    let s = Settings::with_defaults(Path::new("/srv/app"), day()).unwrap();

    assert!(s.logging_enabled);
    assert_eq!(s.max_buffer_bytes, 5_242_880);
    assert!(s.sinks.canonical_file);
    assert!(!s.sinks.raw_file);
    assert!(!s.sinks.raw_console);
    assert!(!s.sinks.canonical_console);
    assert_eq!(s.log_directory, Path::new("/srv/app/MessageLogs/16Oct2026"));
    assert_eq!(s.fallback_directory, Path::new("/srv/app/MessageLogs"));
}

#[test]
fn yaml_values_and_date_placeholder_are_applied() {
    let yaml = r#"
EnableLogging: false
LoggingPath: "/var/log/soap/{date}/calls"
MaxMessageSize: 1024
RawConsole: TRUE
CanonicalFile: false
"#;
    let layers = config::load_from_str(yaml).unwrap();
    let s = Settings::from_lookup(&layers, Path::new("/srv/app"), day()).unwrap();

    assert!(!s.logging_enabled);
    assert_eq!(s.log_directory_template, "/var/log/soap/{date}/calls");
    assert_eq!(s.log_directory, Path::new("/var/log/soap/16Oct2026/calls"));
    assert_eq!(s.max_buffer_bytes, 1024);
    assert!(s.sinks.raw_console);
    assert!(!s.sinks.canonical_file);
}

#[test]
fn override_layer_beats_file_layer() {
    let layers = LayeredConfig::new()
        .with_layer(StaticSource::from_pairs("override", [(keys::MAX_MESSAGE_SIZE, "64")]))
        .with_layer(StaticSource::from_yaml_str("file", "MaxMessageSize: 2048\nRawFile: true\n").unwrap());
    let s = Settings::from_lookup(&layers, Path::new("/srv/app"), day()).unwrap();

    assert_eq!(s.max_buffer_bytes, 64);
    assert!(s.sinks.raw_file);
}

#[test]
fn unparsable_values_fall_back_to_defaults() {
    let layers = config::load_from_str("MaxMessageSize: lots\nEnableLogging: maybe\n").unwrap();
    let s = Settings::from_lookup(&layers, Path::new("/srv/app"), day()).unwrap();

    assert_eq!(s.max_buffer_bytes, 5_242_880);
    assert!(s.logging_enabled);
}

#[test]
fn invalid_values_are_rejected() {
    for yaml in ["MaxMessageSize: 0\n", "MaxMessageSize: -5\n", "LoggingPath: \"  \"\n"] {
        let layers = config::load_from_str(yaml).unwrap();
        let err = Settings::from_lookup(&layers, Path::new("/srv/app"), day()).expect_err(yaml);
        assert_eq!(err.kind().as_str(), "config", "{yaml}");
    }
}

#[test]
fn nested_yaml_is_rejected() {
    let err = config::load_from_str("Sinks:\n  RawFile: true\n").err().expect("must fail");
    assert_eq!(err.kind().as_str(), "config");
}

#[test]
fn missing_file_uses_environment_and_defaults() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("absent.yaml");
    let layers = config::load_from_file(path.to_str().unwrap()).unwrap();
    assert_eq!(layers.layer_names(), vec!["environment"]);
}

#[test]
fn file_layer_is_loaded_when_present() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("soaptap.yaml");
    std::fs::write(&path, "RawFile: true\n").unwrap();

    let layers = config::load_from_file(path.to_str().unwrap()).unwrap();
    assert_eq!(layers.layer_names().len(), 2);
    assert!(layers.get_bool(keys::RAW_FILE, false));
}
