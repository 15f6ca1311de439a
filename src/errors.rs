//! Error types shared across the application.

use std::fmt::{Display, Formatter};
use std::io::ErrorKind;

/// Shared application result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error enumeration covering all domain failure modes.
#[derive(Debug)]
pub enum AppError {
    /// Configuration parsing or validation failure.
    Config(String),
    /// Console connection failure (unreachable, timeout, reset).
    Transport(String),
    /// Command rejected at the boundary (malformed parameter).
    Command(String),
    /// Local control socket failure.
    Ipc(String),
    /// File-system or I/O operation failure.
    Io(String),
    /// The console link has been shut down and accepts no further requests.
    Shutdown(String),
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Transport(msg) => write!(f, "transport: {msg}"),
            Self::Command(msg) => write!(f, "command: {msg}"),
            Self::Ipc(msg) => write!(f, "ipc: {msg}"),
            Self::Io(msg) => write!(f, "io: {msg}"),
            Self::Shutdown(msg) => write!(f, "shutdown: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid config: {err}"))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Classification of a transport failure, reported alongside
/// [`ConnectionState::Errored`](crate::models::state::ConnectionState::Errored).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportErrorKind {
    /// The console refused the connection or could not be reached.
    RefusedOrUnreachable,
    /// The connect attempt did not complete within the deadline.
    Timeout,
    /// An established connection was reset or closed by the console.
    ResetByPeer,
}

impl TransportErrorKind {
    /// Classify an I/O error raised while connecting, reading, or writing.
    #[must_use]
    pub fn classify(err: &std::io::Error) -> Self {
        match err.kind() {
            ErrorKind::TimedOut | ErrorKind::WouldBlock => Self::Timeout,
            ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::BrokenPipe
            | ErrorKind::UnexpectedEof
            | ErrorKind::NotConnected => Self::ResetByPeer,
            _ => Self::RefusedOrUnreachable,
        }
    }
}

impl Display for TransportErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::RefusedOrUnreachable => "refused or unreachable",
            Self::Timeout => "timeout",
            Self::ResetByPeer => "reset by peer",
        };
        f.write_str(label)
    }
}
