//! Local IPC server for `onyx-link-ctl` commands.
//!
//! Listens on a named pipe (Windows) or Unix domain socket (Linux/macOS)
//! using the `interprocess` crate. Accepts line-delimited JSON commands
//! and routes them to the console supervisor through its handle.
//!
//! ## Protocol
//!
//! Request (one JSON object per line):
//! ```json
//! {"command": "send", "action": {"intent": "go_cue", "cuelist": "3", "cue": "7"}}
//! {"command": "status"}
//! {"command": "is_active", "cuelist": 5}
//! {"command": "shutdown"}
//! ```
//!
//! Response (one JSON object per line):
//! ```json
//! {"ok": true, "data": { ... } }
//! {"ok": false, "error": "unauthorized"}
//! ```

use std::sync::Arc;

use interprocess::local_socket::{tokio::prelude::*, GenericNamespaced, ListenerOptions};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, warn, Instrument};

use crate::models::command::Command;
use crate::models::cuelist::CuelistId;
use crate::supervisor::ConsoleHandle;
use crate::{AppError, Result};

/// Everything an IPC request may touch.
#[derive(Debug, Clone)]
pub struct ControlState {
    /// Handle to the running console supervisor.
    pub handle: ConsoleHandle,
    /// Shared secret required on every request, when set.
    pub auth_token: Option<String>,
    /// Cancelled by the `shutdown` command to stop the daemon.
    pub shutdown: CancellationToken,
}

/// Inbound IPC request from `onyx-link-ctl`.
#[derive(Debug, Deserialize)]
struct IpcRequest {
    /// Command verb.
    command: String,
    /// Console action (for `send`), tagged by `intent`.
    action: Option<serde_json::Value>,
    /// Cue list number (for `is_active`).
    cuelist: Option<CuelistId>,
    /// Shared-secret authentication token.
    auth_token: Option<String>,
}

/// Outbound IPC response to `onyx-link-ctl`.
#[derive(Debug, Serialize)]
struct IpcResponse {
    /// Whether the command succeeded.
    ok: bool,
    /// Payload on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<serde_json::Value>,
    /// Error message on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl IpcResponse {
    fn success(data: serde_json::Value) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Spawn the IPC server task.
///
/// # Errors
///
/// Returns `AppError::Ipc` if the listener cannot be created.
pub fn spawn_ipc_server(
    name: &str,
    state: Arc<ControlState>,
    ct: CancellationToken,
) -> Result<tokio::task::JoinHandle<()>> {
    let name = name.to_owned();

    let listener_name = name
        .clone()
        .to_ns_name::<GenericNamespaced>()
        .map_err(|err| AppError::Ipc(format!("invalid ipc socket name '{name}': {err}")))?;

    let listener = ListenerOptions::new()
        .name(listener_name)
        .create_tokio()
        .map_err(|err| AppError::Ipc(format!("failed to create ipc listener: {err}")))?;

    info!(ipc_name = %name, "IPC server listening");

    let handle = tokio::spawn(async move {
        let span = info_span!("ipc_server", name = %name);
        async move {
            loop {
                tokio::select! {
                    () = ct.cancelled() => {
                        info!("IPC server shutting down");
                        break;
                    }
                    accept_result = listener.accept() => {
                        match accept_result {
                            Ok(stream) => {
                                let state = Arc::clone(&state);
                                tokio::spawn(handle_connection(stream, state));
                            }
                            Err(err) => {
                                warn!(%err, "IPC accept failed");
                            }
                        }
                    }
                }
            }
        }
        .instrument(span)
        .await;
    });

    Ok(handle)
}

/// Handle a single IPC client connection.
async fn handle_connection(
    stream: interprocess::local_socket::tokio::Stream,
    state: Arc<ControlState>,
) {
    let span = info_span!("ipc_conn");
    async move {
        let (reader, mut writer) = stream.split();
        let mut buf_reader = BufReader::new(reader);
        let mut line = String::new();

        loop {
            line.clear();
            match buf_reader.read_line(&mut line).await {
                Ok(0) => break, // EOF
                Ok(_) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }

                    let mut response_line = handle_request_line(trimmed, &state).await;
                    response_line.push('\n');

                    if let Err(err) = writer.write_all(response_line.as_bytes()).await {
                        warn!(%err, "failed to write ipc response");
                        break;
                    }
                }
                Err(err) => {
                    warn!(%err, "ipc read error");
                    break;
                }
            }
        }

        info!("IPC connection closed");
    }
    .instrument(span)
    .await;
}

/// Parse one request line, run it, and return the serialized response.
pub async fn handle_request_line(line: &str, state: &ControlState) -> String {
    let response = match serde_json::from_str::<IpcRequest>(line) {
        Ok(request) => dispatch_command(&request, state).await,
        Err(err) => IpcResponse::error(format!("invalid json: {err}")),
    };
    serde_json::to_string(&response)
        .unwrap_or_else(|_| r#"{"ok":false,"error":"serialization failed"}"#.to_owned())
}

/// Route an IPC command to the appropriate handler.
async fn dispatch_command(request: &IpcRequest, state: &ControlState) -> IpcResponse {
    let span = info_span!("ipc_command", command = %request.command);

    async move {
        if let Some(ref expected) = state.auth_token {
            match request.auth_token {
                Some(ref provided) if provided == expected => {}
                _ => {
                    warn!(command = %request.command, "IPC request rejected: invalid auth token");
                    return IpcResponse::error("unauthorized");
                }
            }
        }

        match request.command.as_str() {
            "send" => handle_send(request, state).await,
            "status" => handle_status(state),
            "is_active" => handle_is_active(request, state),
            "shutdown" => handle_shutdown(state).await,
            other => IpcResponse::error(format!("unknown command: {other}")),
        }
    }
    .instrument(span)
    .await
}

/// Submit a console action.
async fn handle_send(request: &IpcRequest, state: &ControlState) -> IpcResponse {
    let Some(ref action) = request.action else {
        return IpcResponse::error("missing required 'action' field");
    };

    let command = match serde_json::from_value::<Command>(action.clone()) {
        Ok(command) => command,
        Err(err) => return IpcResponse::error(format!("invalid action: {err}")),
    };
    let intent = command.intent();

    match state.handle.submit_command(command).await {
        Ok(outcome) => {
            info!(intent, ?outcome, "action submitted via IPC");
            IpcResponse::success(serde_json::json!({ "intent": intent, "outcome": outcome }))
        }
        Err(err) => IpcResponse::error(err.to_string()),
    }
}

/// Report connection state and the latest snapshot.
fn handle_status(state: &ControlState) -> IpcResponse {
    let status = state.handle.status();
    let snapshot = state.handle.active_cuelists();

    IpcResponse::success(serde_json::json!({
        "state": status.state,
        "message": status.message,
        "active_cuelists": snapshot.to_vec(),
        "captured_at": snapshot.captured_at().map(|at| at.to_rfc3339()),
    }))
}

/// Answer whether one cue list is active.
fn handle_is_active(request: &IpcRequest, state: &ControlState) -> IpcResponse {
    let Some(cuelist) = request.cuelist else {
        return IpcResponse::error("missing required 'cuelist' field");
    };

    IpcResponse::success(serde_json::json!({
        "cuelist": cuelist,
        "active": state.handle.is_active(cuelist),
    }))
}

/// Shut the supervisor down and stop the daemon.
async fn handle_shutdown(state: &ControlState) -> IpcResponse {
    state.handle.shutdown().await;
    state.shutdown.cancel();
    info!("shutdown requested via IPC");
    IpcResponse::success(serde_json::json!({ "status": "shut_down" }))
}
