use reqlog_core::config::{FileSinkConfig, SinkConfig, SinkKind};
use reqlog_observability::{FileSink, LogSink, build_sink};
use serde_json::{Value, json};
use std::fs;
use tempfile::TempDir;
use tracing::Level;

#[test]
fn default_config_builds_tracing_sink() {
    let sink = build_sink(&SinkConfig::default()).unwrap();
    sink.write(Level::DEBUG, "Timing for http://localhost/", &json!({}))
        .unwrap();
}

#[test]
fn file_sink_writes_one_json_line_per_event() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("logs").join("request-logs.log");
    let config = SinkConfig {
        kind: SinkKind::File,
        file: FileSinkConfig {
            path: path.clone(),
            max_file_size_bytes: 0,
            max_rotated_files: 0,
        },
        ..SinkConfig::default()
    };
    let sink = build_sink(&config).unwrap();

    let ctx = json!({
        "http": {"request": {"method": "GET"}, "response": {"status_code": 200}},
        "log": {"type": "request-logs"}
    });
    sink.write(Level::DEBUG, "Timing for http://localhost/a", &ctx).unwrap();
    sink.write(Level::DEBUG, "Timing for http://localhost/b", &ctx).unwrap();

    let content = fs::read_to_string(&path).unwrap();
    let lines: Vec<Value> = content
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["message"], "Timing for http://localhost/a");
    assert_eq!(lines[0]["level"], "debug");
    assert_eq!(lines[0]["context"]["http"]["response"]["status_code"], 200);
    assert!(lines[1]["@timestamp"].as_str().unwrap().ends_with('Z'));
}

#[test]
fn file_sink_reopens_existing_file_in_append_mode() {
    let dir = TempDir::new().unwrap();
    let config = FileSinkConfig {
        path: dir.path().join("request-logs.log"),
        max_file_size_bytes: 0,
        max_rotated_files: 0,
    };
    FileSink::new(config.clone()).unwrap().write_line("first").unwrap();
    FileSink::new(config.clone()).unwrap().write_line("second").unwrap();

    let content = fs::read_to_string(&config.path).unwrap();
    assert_eq!(content, "first\nsecond\n");
}

#[cfg(not(feature = "victoria"))]
#[test]
fn victoria_requires_feature() {
    let config = SinkConfig {
        kind: SinkKind::Victoria,
        ..SinkConfig::default()
    };
    assert!(build_sink(&config).is_err());
}
