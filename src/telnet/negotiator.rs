//! Telnet option negotiation that refuses everything.
//!
//! The console interleaves printable text with `IAC` command sequences.
//! [`Negotiator::feed`] strips every command from the byte stream and
//! produces the refusal replies the peer expects:
//!
//! | Received         | Reply            |
//! |------------------|------------------|
//! | `IAC WILL <opt>` | `IAC DONT <opt>` |
//! | `IAC DO <opt>`   | `IAC WONT <opt>` |
//! | `IAC WONT <opt>` | *(none)*         |
//! | `IAC DONT <opt>` | *(none)*         |
//! | `IAC IAC`        | *(literal 0xFF kept as data)* |
//! | `IAC SB … IAC SE`| *(dropped)*      |
//!
//! Parser state is kept between calls, so a sequence split across reads is
//! completed when the next chunk arrives.

use tracing::debug;

/// Interpret As Command.
pub const IAC: u8 = 255;
/// Refuse to let the peer enable an option.
pub const DONT: u8 = 254;
/// Ask the peer to enable an option.
pub const DO: u8 = 253;
/// Refuse to enable an option locally.
pub const WONT: u8 = 252;
/// Offer to enable an option locally.
pub const WILL: u8 = 251;
/// Sub-negotiation begin.
pub const SB: u8 = 250;
/// Sub-negotiation end.
pub const SE: u8 = 240;

/// Where the parser is within an `IAC` sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Plain payload bytes.
    Data,
    /// Seen `IAC`, waiting for the command byte.
    Iac,
    /// Seen `IAC <verb>`, waiting for the option byte.
    Option(u8),
    /// Inside `IAC SB`, skipping until `IAC SE`.
    Sub,
    /// Seen `IAC` inside a sub-negotiation.
    SubIac,
}

/// Output of one [`Negotiator::feed`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Negotiated {
    /// Payload bytes with every command sequence removed.
    pub payload: Vec<u8>,
    /// Refusal sequences to write back to the peer, in arrival order.
    pub replies: Vec<u8>,
}

/// Incremental `IAC` stripper and refusal generator.
#[derive(Debug)]
pub struct Negotiator {
    state: State,
}

impl Default for Negotiator {
    fn default() -> Self {
        Self::new()
    }
}

impl Negotiator {
    /// Create a negotiator positioned at the start of a stream.
    #[must_use]
    pub fn new() -> Self {
        Self { state: State::Data }
    }

    /// Whether a partial command sequence is waiting for more bytes.
    #[must_use]
    pub fn is_mid_sequence(&self) -> bool {
        self.state != State::Data
    }

    /// Consume `chunk`, returning the clean payload and any replies owed.
    pub fn feed(&mut self, chunk: &[u8]) -> Negotiated {
        let mut out = Negotiated {
            payload: Vec::with_capacity(chunk.len()),
            replies: Vec::new(),
        };

        for &byte in chunk {
            self.state = match self.state {
                State::Data if byte == IAC => State::Iac,
                State::Data => {
                    out.payload.push(byte);
                    State::Data
                }
                State::Iac => match byte {
                    IAC => {
                        out.payload.push(IAC);
                        State::Data
                    }
                    WILL | WONT | DO | DONT => State::Option(byte),
                    SB => State::Sub,
                    other => {
                        debug!(command = other, "telnet: dropping two-byte command");
                        State::Data
                    }
                },
                State::Option(verb) => {
                    if let Some(reply) = refusal_for(verb) {
                        debug!(option = byte, "telnet: refusing capability offer");
                        out.replies.extend_from_slice(&[IAC, reply, byte]);
                    }
                    State::Data
                }
                State::Sub if byte == IAC => State::SubIac,
                State::Sub => State::Sub,
                State::SubIac if byte == SE => State::Data,
                State::SubIac => State::Sub,
            };
        }

        out
    }
}

/// Refusal verb owed for an incoming negotiation verb, if any.
fn refusal_for(verb: u8) -> Option<u8> {
    match verb {
        WILL => Some(DONT),
        DO => Some(WONT),
        _ => None,
    }
}
