//! Hot-reload watcher for the `[console]` table in `config.toml`.
//!
//! [`ConfigWatcher`] uses the `notify` crate to watch `config.toml` for
//! file-system changes.  When a change is detected it re-parses the
//! `[console]` table and publishes the new [`ConnectionConfig`] on a
//! [`tokio::sync::watch`] channel.  The rest of
//! [`GlobalConfig`](crate::GlobalConfig) still requires a restart.
//!
//! Subscribers see a new value only when the
//! parsed settings actually differ, so editor save storms do not trigger a
//! reconnect per event.
//!
//! ## Usage
//!
//! ```no_run
//! use std::path::Path;
//! use onyx_link::config_watcher::ConfigWatcher;
//!
//! let watcher = ConfigWatcher::new(Path::new("config.toml")).expect("watcher");
//! let mut rx = watcher.subscribe();
//! ```

use std::path::{Path, PathBuf};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use serde::Deserialize;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::config::ConnectionConfig;
use crate::{AppError, Result};

/// Minimal TOML structure used for hot-reload parsing.
///
/// The `[console]` table is required here: a file caught mid-write (often
/// empty) must fail to parse rather than look like an idle configuration.
#[derive(Debug, Deserialize)]
struct ConsoleOnlyConfig {
    console: ConnectionConfig,
}

/// Parse and validate only the `[console]` table from a TOML file.
///
/// # Errors
///
/// Returns `AppError::Config` if the file cannot be read, contains invalid
/// TOML, has no `[console]` table, or the console settings fail validation.
pub fn parse_console_config(path: &Path) -> Result<ConnectionConfig> {
    let raw = std::fs::read_to_string(path).map_err(|err| {
        AppError::Config(format!("failed to read config for console hot-reload: {err}"))
    })?;
    let parsed: ConsoleOnlyConfig = toml::from_str(&raw).map_err(|err| {
        AppError::Config(format!("failed to parse console settings from config: {err}"))
    })?;
    parsed.console.validate()?;
    Ok(parsed.console)
}

/// Returns `true` for file-system events that indicate the watched file was
/// written or replaced (create, modify, remove).
fn is_config_change(event: &Event) -> bool {
    matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    )
}

/// Hot-reload watcher for console connection settings.
///
/// Dropping a `ConfigWatcher` stops the underlying OS watch and closes the
/// channel, so callers must keep it alive for as long as hot-reload is needed.
pub struct ConfigWatcher {
    /// Underlying notify watcher, kept alive by owning it here.
    _watcher: RecommendedWatcher,
    /// Latest successfully parsed console settings.
    tx: watch::Sender<ConnectionConfig>,
}

impl ConfigWatcher {
    /// Create a new `ConfigWatcher` that watches `config_path` for changes.
    ///
    /// The initial value is parsed at creation time; if that fails the
    /// watcher starts from [`ConnectionConfig::default`] (no host, so the
    /// link stays idle) and logs a warning.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the `notify` watcher itself cannot be
    /// created or the path cannot be watched.
    pub fn new(config_path: &Path) -> Result<Self> {
        let initial = parse_console_config(config_path).unwrap_or_else(|err| {
            warn!(%err, path = %config_path.display(), "failed to load initial console settings; starting idle");
            ConnectionConfig::default()
        });

        let (tx, _rx) = watch::channel(initial);
        let tx_for_callback = tx.clone();
        let path_for_callback: PathBuf = config_path.to_path_buf();

        let mut watcher = notify::recommended_watcher(
            move |result: std::result::Result<Event, notify::Error>| match result {
                Ok(event) if is_config_change(&event) => {
                    match parse_console_config(&path_for_callback) {
                        Ok(updated) => {
                            let changed = tx_for_callback.send_if_modified(|current| {
                                if *current == updated {
                                    false
                                } else {
                                    *current = updated;
                                    true
                                }
                            });
                            if changed {
                                info!(
                                    path = %path_for_callback.display(),
                                    "hot-reloaded console settings from config"
                                );
                            }
                        }
                        Err(err) => {
                            warn!(
                                %err,
                                path = %path_for_callback.display(),
                                "failed to reload console settings, keeping previous values"
                            );
                        }
                    }
                }
                Err(err) => {
                    warn!(%err, "config file watcher error");
                }
                _ => {}
            },
        )
        .map_err(|err| AppError::Config(format!("failed to create config file watcher: {err}")))?;

        // Watch the parent directory so rename-based saves are seen.
        let watch_target = config_path
            .parent()
            .filter(|p| p != &Path::new(""))
            .unwrap_or(config_path);

        watcher
            .watch(watch_target, RecursiveMode::NonRecursive)
            .map_err(|err| {
                AppError::Config(format!(
                    "failed to watch config path '{}': {err}",
                    watch_target.display()
                ))
            })?;

        info!(path = %config_path.display(), "config watcher started for console hot-reload");

        Ok(Self {
            _watcher: watcher,
            tx,
        })
    }

    /// Subscribe to console settings changes.
    ///
    /// The receiver's current value is the latest parsed settings and is
    /// marked as seen, so `changed()` resolves only on a real edit.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ConnectionConfig> {
        self.tx.subscribe()
    }

    /// Snapshot of the latest parsed console settings.
    #[must_use]
    pub fn current(&self) -> ConnectionConfig {
        self.tx.borrow().clone()
    }
}
