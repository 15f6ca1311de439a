//! Byte-stream codec for the console's telnet port.
//!
//! Use [`ConsoleCodec`] as the codec parameter for
//! [`tokio_util::codec::FramedRead`] (inbound) and
//! [`tokio_util::codec::FramedWrite`] (outbound).
//!
//! # Decoder
//!
//! Each call drains everything buffered in `src`, runs it through the
//! [`Negotiator`], and yields one [`InboundChunk`] holding the clean text
//! and the refusals owed to the peer.  Line splitting is left to the poll
//! accumulator so partial lines survive unchanged.  A multi-byte UTF-8
//! character cut by a read boundary is held back until the rest arrives.
//!
//! # Encoder
//!
//! [`Outbound::Line`] is written as `line\r\n` with `0xFF` doubled;
//! [`Outbound::Negotiation`] bytes are written verbatim.

use bytes::{BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::telnet::negotiator::{Negotiated, Negotiator, IAC};
use crate::{AppError, Result};

/// Line terminator used by the console in both directions.
pub const LINE_TERMINATOR: &str = "\r\n";

/// Decoded inbound data from one read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InboundChunk {
    /// Payload text with telnet commands removed.
    pub text: String,
    /// Refusal sequences to write back immediately.
    pub replies: Vec<u8>,
}

/// Outbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// One command line, without terminator.
    Line(String),
    /// Raw negotiation reply bytes.
    Negotiation(Vec<u8>),
}

/// Telnet-aware codec for the console connection.
#[derive(Debug, Default)]
pub struct ConsoleCodec {
    negotiator: Negotiator,
    /// Payload bytes not yet converted to text (incomplete UTF-8 tail).
    carry: Vec<u8>,
}

impl ConsoleCodec {
    /// Create a codec positioned at the start of a stream.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Convert carried payload into text, keeping an incomplete tail.
    fn take_text(&mut self, flush: bool) -> String {
        let keep = if flush {
            0
        } else {
            incomplete_utf8_tail(&self.carry)
        };
        let ready = self.carry.len() - keep;
        let text = String::from_utf8_lossy(&self.carry[..ready]).into_owned();
        self.carry.drain(..ready);
        text
    }
}

impl Decoder for ConsoleCodec {
    type Item = InboundChunk;
    type Error = AppError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        if src.is_empty() {
            return Ok(None);
        }

        let raw = src.split();
        let Negotiated { payload, replies } = self.negotiator.feed(&raw);
        self.carry.extend_from_slice(&payload);
        let text = self.take_text(false);

        if text.is_empty() && replies.is_empty() {
            return Ok(None);
        }
        Ok(Some(InboundChunk { text, replies }))
    }

    /// Flush any held-back bytes lossily when the stream ends.
    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        if let Some(chunk) = self.decode(src)? {
            return Ok(Some(chunk));
        }
        if self.carry.is_empty() {
            return Ok(None);
        }
        Ok(Some(InboundChunk {
            text: self.take_text(true),
            replies: Vec::new(),
        }))
    }
}

impl Encoder<Outbound> for ConsoleCodec {
    type Error = AppError;

    fn encode(&mut self, item: Outbound, dst: &mut BytesMut) -> Result<()> {
        match item {
            Outbound::Line(line) => {
                dst.reserve(line.len() + LINE_TERMINATOR.len());
                for byte in line.bytes() {
                    if byte == IAC {
                        dst.put_u8(IAC);
                    }
                    dst.put_u8(byte);
                }
                dst.put_slice(LINE_TERMINATOR.as_bytes());
            }
            Outbound::Negotiation(bytes) => dst.put_slice(&bytes),
        }
        Ok(())
    }
}

// ── Private helper ────────────────────────────────────────────────────────────

/// Length of a trailing UTF-8 sequence that is still missing bytes.
fn incomplete_utf8_tail(bytes: &[u8]) -> usize {
    for back in 1..=bytes.len().min(3) {
        let byte = bytes[bytes.len() - back];
        if byte & 0b1100_0000 == 0b1000_0000 {
            continue;
        }
        let needed = match byte {
            0xF0..=0xF7 => 4,
            0xE0..=0xEF => 3,
            0xC0..=0xDF => 2,
            _ => 1,
        };
        return if needed > back { back } else { 0 };
    }
    0
}
