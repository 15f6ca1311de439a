//! Global configuration parsing and validation.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::{AppError, Result};

fn default_port() -> u16 {
    2323
}

fn default_poll_interval_ms() -> u64 {
    5000
}

fn default_reconnect_interval_ms() -> u64 {
    5000
}

fn default_connect_timeout_ms() -> u64 {
    1500
}

fn default_ipc_name() -> String {
    "onyx-link".into()
}

/// Connection settings for a single console, taken from the `[console]` table.
///
/// Immutable per connection attempt; a changed value is applied by tearing
/// down the current transport and connecting again.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ConnectionConfig {
    /// Console address (IPv4 or hostname). Empty keeps the link idle.
    #[serde(default)]
    pub host: String,
    /// Console telnet port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Active cue list poll period; 0 disables polling.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Fixed delay between reconnect attempts.
    #[serde(default = "default_reconnect_interval_ms")]
    pub reconnect_interval_ms: u64,
    /// Deadline for a single TCP connect attempt.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Discard poll response lines that arrive while no poll is outstanding.
    #[serde(default)]
    pub reject_unsolicited: bool,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: default_port(),
            poll_interval_ms: default_poll_interval_ms(),
            reconnect_interval_ms: default_reconnect_interval_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            reject_unsolicited: false,
        }
    }
}

impl ConnectionConfig {
    /// Build a config for `host:port` with every other field at its default.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    /// Whether a console address is configured at all.
    #[must_use]
    pub fn has_host(&self) -> bool {
        !self.host.trim().is_empty()
    }

    /// `host:port` string suitable for [`tokio::net::TcpStream::connect`].
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host.trim(), self.port)
    }

    /// Whether the active cue list poll timer should be armed.
    #[must_use]
    pub fn polling_enabled(&self) -> bool {
        self.poll_interval_ms > 0
    }

    /// Poll period as a [`Duration`].
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Reconnect period as a [`Duration`].
    #[must_use]
    pub fn reconnect_interval(&self) -> Duration {
        Duration::from_millis(self.reconnect_interval_ms)
    }

    /// Connect deadline as a [`Duration`].
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Check the invariants the supervisor relies on.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the port is zero or a timing value
    /// that must be positive is zero.
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(AppError::Config("console.port must be greater than zero".into()));
        }
        if self.reconnect_interval_ms == 0 {
            return Err(AppError::Config(
                "console.reconnect_interval_ms must be greater than zero".into(),
            ));
        }
        if self.connect_timeout_ms == 0 {
            return Err(AppError::Config(
                "console.connect_timeout_ms must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

/// Global configuration parsed from `config.toml`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct GlobalConfig {
    /// Named pipe / Unix socket identifier for the control socket.
    #[serde(default = "default_ipc_name")]
    pub ipc_name: String,
    /// Shared secret required on control socket requests, when set.
    #[serde(default)]
    pub ipc_auth_token: Option<String>,
    /// Console connection settings.
    #[serde(default)]
    pub console: ConnectionConfig,
}

impl GlobalConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.ipc_name.trim().is_empty() {
            return Err(AppError::Config("ipc_name must not be empty".into()));
        }
        self.console.validate()
    }
}
