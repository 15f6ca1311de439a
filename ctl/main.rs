#![forbid(unsafe_code)]

//! `onyx-link-ctl`: local CLI companion for `onyx-link`.
//!
//! Connects to the IPC socket and sends JSON commands to the daemon.
//! Useful for testing cue buttons and checking the link from a shell.

use std::io::{BufRead, BufReader, Write};

use clap::{Parser, Subcommand};
use interprocess::local_socket::{traits::Stream as _, GenericNamespaced, Stream, ToNsName};

#[derive(Debug, Parser)]
#[command(
    name = "onyx-link-ctl",
    about = "Local CLI for the onyx-link daemon",
    version,
    long_about = None
)]
struct Cli {
    /// IPC socket name (must match the daemon's `ipc_name` config).
    #[arg(long, default_value = "onyx-link")]
    ipc_name: String,

    /// Shared secret, when the daemon sets `ipc_auth_token`.
    #[arg(long, env = "ONYX_LINK_AUTH_TOKEN")]
    auth_token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show connection state and the active cue lists.
    Status,

    /// Report whether one cue list is active.
    Active {
        /// Cue list number.
        cuelist: u32,
    },

    /// Clear the programmer.
    ClearProgrammer,

    /// Release all overrides.
    ReleaseAllOverrides,

    /// Release all cue lists.
    ReleaseAllCuelists,

    /// Release all cue lists, dimmer first.
    ReleaseAllCuelistsDf,

    /// Release all cue lists and overrides, dimmer first.
    ReleaseAllCuelistsOverridesDf,

    /// Release all cue lists and overrides.
    ReleaseAllCuelistsOverrides,

    /// Release one cue list.
    Release {
        /// Cue list number.
        cuelist: String,
    },

    /// Go on one cue list.
    Go {
        /// Cue list number.
        cuelist: String,
    },

    /// Go on a schedule.
    GoSchedule {
        /// Schedule number.
        schedule: String,
    },

    /// Go to a cue in a cue list.
    GoCue {
        /// Cue list number.
        cuelist: String,
        /// Cue number, e.g. `7` or `7.5`.
        cue: String,
    },

    /// Pause a cue list.
    Pause {
        /// Cue list number.
        cuelist: String,
    },

    /// Send one line of text as-is.
    Raw {
        /// Console command text.
        text: String,
    },

    /// Stop the daemon.
    Shutdown,
}

impl Command {
    /// Build the JSON request for this subcommand.
    fn to_request(&self) -> serde_json::Value {
        let send = |action: serde_json::Value| serde_json::json!({ "command": "send", "action": action });

        match self {
            Self::Status => serde_json::json!({ "command": "status" }),
            Self::Active { cuelist } => {
                serde_json::json!({ "command": "is_active", "cuelist": cuelist })
            }
            Self::Shutdown => serde_json::json!({ "command": "shutdown" }),
            Self::ClearProgrammer => send(serde_json::json!({ "intent": "clear_programmer" })),
            Self::ReleaseAllOverrides => {
                send(serde_json::json!({ "intent": "release_all_overrides" }))
            }
            Self::ReleaseAllCuelists => send(serde_json::json!({ "intent": "release_all_cuelists" })),
            Self::ReleaseAllCuelistsDf => send(serde_json::json!({
                "intent": "release_all_cuelists_dimmer_first"
            })),
            Self::ReleaseAllCuelistsOverridesDf => send(serde_json::json!({
                "intent": "release_all_cuelists_and_overrides_dimmer_first"
            })),
            Self::ReleaseAllCuelistsOverrides => send(serde_json::json!({
                "intent": "release_all_cuelists_and_overrides"
            })),
            Self::Release { cuelist } => {
                send(serde_json::json!({ "intent": "release_cuelist", "cuelist": cuelist }))
            }
            Self::Go { cuelist } => {
                send(serde_json::json!({ "intent": "go_cuelist", "cuelist": cuelist }))
            }
            Self::GoSchedule { schedule } => {
                send(serde_json::json!({ "intent": "go_schedule", "schedule": schedule }))
            }
            Self::GoCue { cuelist, cue } => send(serde_json::json!({
                "intent": "go_cue",
                "cuelist": cuelist,
                "cue": cue,
            })),
            Self::Pause { cuelist } => {
                send(serde_json::json!({ "intent": "pause_cuelist", "cuelist": cuelist }))
            }
            Self::Raw { text } => send(serde_json::json!({ "intent": "raw", "text": text })),
        }
    }
}

fn main() {
    let args = Cli::parse();

    let mut request_json = args.command.to_request();
    if let Some(ref token) = args.auth_token {
        request_json["auth_token"] = serde_json::Value::String(token.clone());
    }

    match send_ipc_command(&args.ipc_name, &request_json) {
        Ok(response) => {
            if let Some(obj) = response.as_object() {
                let ok = obj
                    .get("ok")
                    .and_then(serde_json::Value::as_bool)
                    .unwrap_or(false);
                if ok {
                    if let Some(data) = obj.get("data") {
                        println!("{}", serde_json::to_string_pretty(data).unwrap_or_default());
                    } else {
                        println!("OK");
                    }
                } else {
                    let err_msg = obj
                        .get("error")
                        .and_then(|v| v.as_str())
                        .unwrap_or("unknown error");
                    eprintln!("Error: {err_msg}");
                    std::process::exit(1);
                }
            } else {
                println!("{response}");
            }
        }
        Err(err) => {
            eprintln!("Failed to connect to daemon: {err}");
            eprintln!("Is onyx-link running with ipc_name '{}'?", args.ipc_name);
            std::process::exit(1);
        }
    }
}

/// Connect to the IPC socket, send a JSON command, and read the response.
fn send_ipc_command(
    ipc_name: &str,
    request: &serde_json::Value,
) -> std::result::Result<serde_json::Value, Box<dyn std::error::Error>> {
    let name = ipc_name.to_ns_name::<GenericNamespaced>()?;
    let mut stream = Stream::connect(name)?;

    let mut request_line = serde_json::to_string(request)?;
    request_line.push('\n');
    stream.write_all(request_line.as_bytes())?;
    stream.flush()?;

    let mut reader = BufReader::new(&stream);
    let mut response_line = String::new();
    reader.read_line(&mut response_line)?;

    let response: serde_json::Value = serde_json::from_str(response_line.trim())?;
    Ok(response)
}
