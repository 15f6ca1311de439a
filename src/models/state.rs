//! Connection state reported to the collaborator.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// State of the single managed console connection.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// No transport is open.
    #[default]
    Disconnected,
    /// A connect attempt is in flight.
    Connecting,
    /// The transport is established and commands are written.
    Connected,
    /// The last attempt or connection failed; a reconnect is pending.
    Errored,
}

impl ConnectionState {
    /// Whether commands may be written in this state.
    #[must_use]
    pub fn is_connected(self) -> bool {
        matches!(self, Self::Connected)
    }
}

impl Display for ConnectionState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Errored => "errored",
        };
        f.write_str(label)
    }
}
