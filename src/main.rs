#![forbid(unsafe_code)]

//! `onyx-link`: console link daemon.
//!
//! Bootstraps configuration, starts the console supervisor, the config file
//! watcher, and the IPC server for `onyx-link-ctl`.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use onyx_link::config::{ConnectionConfig, GlobalConfig};
use onyx_link::config_watcher::ConfigWatcher;
use onyx_link::ipc::server::{spawn_ipc_server, ControlState};
use onyx_link::supervisor::{self, ConsoleEvent, ConsoleHandle};
use onyx_link::{AppError, Result};

/// Capacity of the console event channel drained by the logging task.
const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "onyx-link", about = "ONYX console telnet link", version, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long)]
    config: PathBuf,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Override the console host from the configuration file.
    #[arg(long)]
    host: Option<String>,

    /// Override the console port from the configuration file.
    #[arg(long)]
    port: Option<u16>,
}

impl Cli {
    /// Apply command-line overrides to console settings.
    fn apply_overrides(&self, mut console: ConnectionConfig) -> ConnectionConfig {
        if let Some(ref host) = self.host {
            console.host.clone_from(host);
        }
        if let Some(port) = self.port {
            console.port = port;
        }
        console
    }
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.log_format)?;
    info!("onyx-link bootstrap");

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(args))
}

async fn run(args: Cli) -> Result<()> {
    // ── Load configuration ──────────────────────────────
    let mut config = GlobalConfig::load_from_path(&args.config)?;
    config.console = args.apply_overrides(config.console);
    config.console.validate()?;
    info!(
        host = %config.console.host,
        port = config.console.port,
        "configuration loaded"
    );

    // ── Start the console supervisor ────────────────────
    let ct = CancellationToken::new();
    let (event_tx, event_rx) = mpsc::channel(EVENT_CAPACITY);
    let (handle, supervisor_task) =
        supervisor::spawn(config.console.clone(), event_tx, ct.child_token())?;
    let events_task = tokio::spawn(log_events(event_rx));

    // ── Hot-reload console settings ─────────────────────
    let watcher = match ConfigWatcher::new(&args.config) {
        Ok(watcher) => Some(watcher),
        Err(err) => {
            warn!(%err, "config hot-reload disabled");
            None
        }
    };
    let reload_task = watcher.as_ref().map(|watcher| {
        tokio::spawn(forward_config_changes(
            watcher.subscribe(),
            handle.clone(),
            Arc::new(args),
            ct.clone(),
        ))
    });

    // ── Start IPC server ────────────────────────────────
    let state = Arc::new(ControlState {
        handle: handle.clone(),
        auth_token: config.ipc_auth_token.clone(),
        shutdown: ct.clone(),
    });
    let ipc_handle = spawn_ipc_server(&config.ipc_name, state, ct.clone())?;

    info!("onyx-link ready");

    // ── Wait for shutdown signal ────────────────────────
    tokio::select! {
        () = shutdown_signal() => info!("shutdown signal received"),
        () = ct.cancelled() => info!("shutdown requested"),
    }
    handle.shutdown().await;
    ct.cancel();

    // ── Wait for background tasks ───────────────────────
    let _ = tokio::join!(supervisor_task, ipc_handle);
    if let Some(task) = reload_task {
        let _ = task.await;
    }
    drop(watcher);
    drop(handle);
    let _ = events_task.await;
    info!("onyx-link shut down");

    Ok(())
}

/// Push each hot-reloaded console table into the supervisor.
async fn forward_config_changes(
    mut rx: tokio::sync::watch::Receiver<ConnectionConfig>,
    handle: ConsoleHandle,
    args: Arc<Cli>,
    ct: CancellationToken,
) {
    loop {
        tokio::select! {
            () = ct.cancelled() => break,
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let console = args.apply_overrides(rx.borrow_and_update().clone());
                if let Err(err) = handle.update_config(console).await {
                    error!(%err, "failed to apply reloaded console settings");
                }
            }
        }
    }
}

/// Log every console event until the supervisor goes away.
async fn log_events(mut rx: mpsc::Receiver<ConsoleEvent>) {
    while let Some(event) = rx.recv().await {
        match event {
            ConsoleEvent::ConnectionStateChanged { state, message } => {
                info!(%state, message, "console connection state changed");
            }
            ConsoleEvent::ActiveCuelistsChanged(set) => {
                info!(active = ?set.to_vec(), "active cue lists changed");
            }
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(err) => {
                tracing::warn!(%err, "failed to register SIGTERM handler, using ctrl-c only");
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = ctrl_c.await {
            tracing::error!(%err, "ctrl-c signal handler failed");
        }
    }
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(env_filter);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
