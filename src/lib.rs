#![forbid(unsafe_code)]

//! `onyx-link`: telnet control link for ONYX lighting consoles.
//!
//! Keeps one supervised TCP connection to the console, refuses every
//! telnet option, sends operator commands as text lines, and polls the
//! set of active cue lists so indicators can reflect it.

pub mod accumulator;
pub mod config;
pub mod config_watcher;
pub mod dispatcher;
pub mod errors;
pub mod ipc;
pub mod models;
pub mod supervisor;
pub mod telnet;
pub mod transport;

pub use config::{ConnectionConfig, GlobalConfig};
pub use errors::{AppError, Result};
