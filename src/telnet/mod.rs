//! Telnet line protocol handling for the console port.
//!
//! - `negotiator`: incremental `IAC` parser that declines every option.
//! - `codec`: [`tokio_util::codec`] framing built on the negotiator.

pub mod codec;
pub mod negotiator;
