//! Contract tests for the IPC JSON-line protocol.
//!
//! Exercises request parsing and response shapes without a socket, against
//! a supervisor with no console configured.

use onyx_link::config::ConnectionConfig;
use onyx_link::ipc::server::{handle_request_line, ControlState};
use onyx_link::supervisor;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

fn idle_state(auth_token: Option<&str>) -> ControlState {
    let (event_tx, _event_rx) = mpsc::channel(16);
    let (handle, _task) = supervisor::spawn(
        ConnectionConfig::default(),
        event_tx,
        CancellationToken::new(),
    )
    .expect("valid config");
    ControlState {
        handle,
        auth_token: auth_token.map(str::to_owned),
        shutdown: CancellationToken::new(),
    }
}

async fn call(state: &ControlState, line: &str) -> Value {
    let response = handle_request_line(line, state).await;
    serde_json::from_str(&response).expect("response is json")
}

#[tokio::test]
async fn status_shape() {
    let state = idle_state(None);
    let response = call(&state, r#"{"command":"status"}"#).await;

    assert_eq!(response["ok"], true);
    assert!(response.get("error").is_none());
    let data = &response["data"];
    assert_eq!(data["state"], "disconnected");
    assert!(data["message"].is_string());
    assert_eq!(data["active_cuelists"], serde_json::json!([]));
    assert!(data["captured_at"].is_null());
}

#[tokio::test]
async fn is_active_shape() {
    let state = idle_state(None);
    let response = call(&state, r#"{"command":"is_active","cuelist":5}"#).await;

    assert_eq!(response["ok"], true);
    assert_eq!(response["data"]["cuelist"], 5);
    assert_eq!(response["data"]["active"], false);
}

#[tokio::test]
async fn is_active_requires_cuelist() {
    let state = idle_state(None);
    let response = call(&state, r#"{"command":"is_active"}"#).await;

    assert_eq!(response["ok"], false);
    assert!(response.get("data").is_none());
    assert_eq!(response["error"], "missing required 'cuelist' field");
}

#[tokio::test]
async fn send_reports_outcome_and_intent() {
    let state = idle_state(None);
    let response = call(
        &state,
        r#"{"command":"send","action":{"intent":"go_cuelist","cuelist":"2"}}"#,
    )
    .await;

    assert_eq!(response["ok"], true);
    assert_eq!(response["data"]["intent"], "go_cuelist");
    assert_eq!(response["data"]["outcome"], "dropped");
}

#[tokio::test]
async fn send_pause_is_unmapped() {
    let state = idle_state(None);
    let response = call(
        &state,
        r#"{"command":"send","action":{"intent":"pause_cuelist","cuelist":"2"}}"#,
    )
    .await;

    assert_eq!(response["data"]["outcome"], "unmapped");
}

#[tokio::test]
async fn send_with_bad_parameter_is_an_error() {
    let state = idle_state(None);
    let response = call(
        &state,
        r#"{"command":"send","action":{"intent":"go_cuelist","cuelist":"two"}}"#,
    )
    .await;

    assert_eq!(response["ok"], false);
    assert!(response["error"]
        .as_str()
        .expect("error string")
        .starts_with("command:"));
}

#[tokio::test]
async fn send_accepts_legacy_command_action() {
    let state = idle_state(None);
    let response = call(
        &state,
        r#"{"command":"send","action":{"intent":"command","command":"RAO"}}"#,
    )
    .await;

    assert_eq!(response["ok"], true);
    assert_eq!(response["data"]["intent"], "raw");
    assert_eq!(response["data"]["outcome"], "dropped");
}

#[tokio::test]
async fn send_requires_action() {
    let state = idle_state(None);
    let response = call(&state, r#"{"command":"send"}"#).await;
    assert_eq!(response["error"], "missing required 'action' field");
}

#[tokio::test]
async fn send_with_unknown_intent_is_an_error() {
    let state = idle_state(None);
    let response = call(
        &state,
        r#"{"command":"send","action":{"intent":"blackout"}}"#,
    )
    .await;

    assert_eq!(response["ok"], false);
    assert!(response["error"]
        .as_str()
        .expect("error string")
        .starts_with("invalid action:"));
}

#[tokio::test]
async fn unknown_command_is_an_error() {
    let state = idle_state(None);
    let response = call(&state, r#"{"command":"reboot"}"#).await;
    assert_eq!(response["error"], "unknown command: reboot");
}

#[tokio::test]
async fn invalid_json_is_an_error() {
    let state = idle_state(None);
    let response = call(&state, "not json").await;

    assert_eq!(response["ok"], false);
    assert!(response["error"]
        .as_str()
        .expect("error string")
        .starts_with("invalid json:"));
}

#[tokio::test]
async fn wrong_auth_token_is_unauthorized() {
    let state = idle_state(Some("s3cret"));
    let response = call(&state, r#"{"command":"status","auth_token":"guess"}"#).await;
    assert_eq!(response["error"], "unauthorized");
}

#[tokio::test]
async fn shutdown_then_send_fails() {
    let state = idle_state(None);
    let response = call(&state, r#"{"command":"shutdown"}"#).await;
    assert_eq!(response["ok"], true);
    assert!(state.shutdown.is_cancelled());

    let response = call(
        &state,
        r#"{"command":"send","action":{"intent":"clear_programmer"}}"#,
    )
    .await;
    assert_eq!(response["ok"], false);
    assert!(response["error"]
        .as_str()
        .expect("error string")
        .starts_with("shutdown:"));
}
