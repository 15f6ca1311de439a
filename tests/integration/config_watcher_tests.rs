//! Integration tests for console settings hot-reload via `ConfigWatcher`.
//!
//! Validates:
//! - the initial value is parsed from the file;
//! - a malformed file at start falls back to idle defaults;
//! - an edit to the `[console]` table is published;
//! - a malformed edit keeps the previous value;
//! - an emptied or truncated file keeps the previous value.

use std::path::Path;
use std::time::Duration;

use onyx_link::config_watcher::{parse_console_config, ConfigWatcher};
use tokio::time::timeout;

const INITIAL: &str = r#"
ipc_name = "onyx-link"

[console]
host = "10.0.0.5"
port = 2323
"#;

const UPDATED: &str = r#"
ipc_name = "onyx-link"

[console]
host = "10.0.0.6"
port = 2424
poll_interval_ms = 1000
"#;

fn write(path: &Path, contents: &str) {
    std::fs::write(path, contents).expect("write config");
}

#[test]
fn parse_reads_only_console_table() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("config.toml");
    write(&path, UPDATED);

    let console = parse_console_config(&path).expect("parse");
    assert_eq!(console.host, "10.0.0.6");
    assert_eq!(console.port, 2424);
    assert_eq!(console.poll_interval_ms, 1000);
    assert_eq!(console.reconnect_interval_ms, 5000);
}

#[test]
fn parse_rejects_invalid_console_settings() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("config.toml");
    write(&path, "[console]\nhost = \"10.0.0.5\"\nport = 0\n");

    assert!(parse_console_config(&path).is_err());
}

#[test]
fn parse_rejects_missing_console_table() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("config.toml");
    write(&path, "ipc_name = \"onyx-link\"\n");

    assert!(parse_console_config(&path).is_err());
}

#[test]
fn parse_rejects_empty_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("config.toml");
    write(&path, "");

    assert!(parse_console_config(&path).is_err());
}

#[test]
fn initial_value_is_loaded() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("config.toml");
    write(&path, INITIAL);

    let watcher = ConfigWatcher::new(&path).expect("watcher");
    assert_eq!(watcher.current().host, "10.0.0.5");
    assert_eq!(watcher.subscribe().borrow().port, 2323);
}

#[test]
fn malformed_initial_file_starts_idle() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("config.toml");
    write(&path, "[console\nhost = ");

    let watcher = ConfigWatcher::new(&path).expect("watcher");
    assert!(!watcher.current().has_host());
}

#[tokio::test]
async fn edit_is_published() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("config.toml");
    write(&path, INITIAL);

    let watcher = ConfigWatcher::new(&path).expect("watcher");
    let mut rx = watcher.subscribe();

    write(&path, UPDATED);

    timeout(Duration::from_secs(5), rx.changed())
        .await
        .expect("change detected in time")
        .expect("watcher alive");
    let current = rx.borrow_and_update().clone();
    assert_eq!(current.host, "10.0.0.6");
    assert_eq!(current.port, 2424);
}

#[tokio::test]
async fn malformed_edit_keeps_previous_value() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("config.toml");
    write(&path, INITIAL);

    let watcher = ConfigWatcher::new(&path).expect("watcher");
    let mut rx = watcher.subscribe();

    write(&path, "[console\nhost = ");
    let changed = timeout(Duration::from_millis(500), rx.changed()).await;

    assert!(changed.is_err(), "a malformed edit must not publish");
    assert_eq!(watcher.current().host, "10.0.0.5");
}

#[tokio::test]
async fn emptied_file_keeps_previous_value() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("config.toml");
    write(&path, INITIAL);

    let watcher = ConfigWatcher::new(&path).expect("watcher");
    let mut rx = watcher.subscribe();

    write(&path, "");
    let changed = timeout(Duration::from_millis(500), rx.changed()).await;

    assert!(changed.is_err(), "an empty file must not publish");
    assert_eq!(watcher.current().host, "10.0.0.5");
    assert_eq!(watcher.current().port, 2323);
}

#[tokio::test]
async fn truncated_file_keeps_previous_value() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("config.toml");
    write(&path, INITIAL);

    let watcher = ConfigWatcher::new(&path).expect("watcher");
    let mut rx = watcher.subscribe();

    write(&path, "ipc_name = \"onyx-link\"\n");
    let changed = timeout(Duration::from_millis(500), rx.changed()).await;

    assert!(changed.is_err(), "a file without a console table must not publish");
    assert_eq!(watcher.current().host, "10.0.0.5");
}
