//! Unit tests for `AppError` display format and transport error classification.

use std::io::{Error, ErrorKind};

use onyx_link::errors::TransportErrorKind;
use onyx_link::AppError;

#[test]
fn each_variant_has_its_own_prefix() {
    let cases = [
        (AppError::Config("x".into()), "config: x"),
        (AppError::Transport("x".into()), "transport: x"),
        (AppError::Command("x".into()), "command: x"),
        (AppError::Ipc("x".into()), "ipc: x"),
        (AppError::Io("x".into()), "io: x"),
        (AppError::Shutdown("x".into()), "shutdown: x"),
    ];
    for (err, expected) in cases {
        assert_eq!(err.to_string(), expected);
    }
}

#[test]
fn io_error_converts_to_io_variant() {
    let err: AppError = Error::new(ErrorKind::BrokenPipe, "pipe gone").into();
    assert!(matches!(err, AppError::Io(ref msg) if msg.contains("pipe gone")));
}

#[test]
fn connect_failures_are_classified() {
    let classify = |kind| TransportErrorKind::classify(&Error::from(kind));

    assert_eq!(
        classify(ErrorKind::ConnectionRefused),
        TransportErrorKind::RefusedOrUnreachable
    );
    assert_eq!(
        classify(ErrorKind::AddrNotAvailable),
        TransportErrorKind::RefusedOrUnreachable
    );
    assert_eq!(classify(ErrorKind::TimedOut), TransportErrorKind::Timeout);
    assert_eq!(
        classify(ErrorKind::ConnectionReset),
        TransportErrorKind::ResetByPeer
    );
    assert_eq!(
        classify(ErrorKind::UnexpectedEof),
        TransportErrorKind::ResetByPeer
    );
}

#[test]
fn error_kind_display_is_human_readable() {
    assert_eq!(TransportErrorKind::Timeout.to_string(), "timeout");
    assert_eq!(TransportErrorKind::ResetByPeer.to_string(), "reset by peer");
    assert_eq!(
        TransportErrorKind::RefusedOrUnreachable.to_string(),
        "refused or unreachable"
    );
}
