//! Poll response accumulator.
//!
//! Buffers console text across reads, splits it on `\r\n`, and turns the
//! lines of a `QLActive` response into an [`ActiveCuelistSet`].
//!
//! A response looks like:
//!
//! ```text
//! 200 Ok
//! 00005Main Stage
//! 00012House Lights
//! .
//! ```
//!
//! The snapshot in progress is private until the `.` terminator line; a
//! response cut short by a disconnect is dropped by [`PollAccumulator::reset`]
//! and never published.

use std::collections::BTreeSet;

use chrono::Utc;
use tracing::{debug, warn};

use crate::models::cuelist::{ActiveCuelistSet, CuelistId};
use crate::telnet::codec::LINE_TERMINATOR;

/// Upper bound on an unterminated fragment held between reads: 1 MiB.
///
/// A peer that never sends `\r\n` would otherwise grow the buffer without
/// limit; past this size the fragment is discarded with a warning.
pub const MAX_PENDING_BYTES: usize = 1_048_576;

/// Line that ends one poll response.
pub const TERMINATOR_LINE: &str = ".";

/// Lines that carry no cue list data.
pub const IGNORED_LINES: [&str; 4] = ["200 Ok", "200 ", "", "No Active Qlist in List"];

/// Width of the zero-padded identifier prefix on a data line.
const ID_WIDTH: usize = 5;

/// Whether a poll is outstanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollPhase {
    /// No poll in flight.
    Idle,
    /// Collecting lines since the last poll command was written.
    Collecting,
}

/// Classification of one response line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// Status or filler line.
    Ignored,
    /// End of the response.
    Terminator,
    /// Data line naming an active cue list.
    Cuelist(CuelistId),
    /// Data line without a numeric prefix.
    Unparseable,
}

/// Classify a single line (terminator already removed).
#[must_use]
pub fn classify_line(line: &str) -> LineKind {
    if line == TERMINATOR_LINE {
        return LineKind::Terminator;
    }
    if IGNORED_LINES.contains(&line) {
        return LineKind::Ignored;
    }
    parse_cuelist_id(line).map_or(LineKind::Unparseable, LineKind::Cuelist)
}

/// Parse the leading run of digits within the first [`ID_WIDTH`] characters.
fn parse_cuelist_id(line: &str) -> Option<CuelistId> {
    let prefix: String = line.chars().take(ID_WIDTH).collect();
    let digits: String = prefix
        .trim_start()
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

/// Incremental parser for poll responses.
#[derive(Debug)]
pub struct PollAccumulator {
    /// Text received but not yet terminated by `\r\n`.
    pending: String,
    /// Identifiers seen since the last terminator.
    building: BTreeSet<CuelistId>,
    phase: PollPhase,
    reject_unsolicited: bool,
}

impl Default for PollAccumulator {
    fn default() -> Self {
        Self::new(false)
    }
}

impl PollAccumulator {
    /// Create an idle accumulator.
    ///
    /// With `reject_unsolicited`, lines arriving while [`PollPhase::Idle`]
    /// are discarded instead of parsed.
    #[must_use]
    pub fn new(reject_unsolicited: bool) -> Self {
        Self {
            pending: String::new(),
            building: BTreeSet::new(),
            phase: PollPhase::Idle,
            reject_unsolicited,
        }
    }

    /// Change the unsolicited-data policy (applied on config update).
    pub fn set_reject_unsolicited(&mut self, reject: bool) {
        self.reject_unsolicited = reject;
    }

    /// Mark a poll command as written.
    pub fn begin_poll(&mut self) {
        self.phase = PollPhase::Collecting;
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> PollPhase {
        self.phase
    }

    /// Bytes held in the unterminated fragment.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Drop buffered text and the snapshot in progress.
    pub fn reset(&mut self) {
        self.pending.clear();
        self.building.clear();
        self.phase = PollPhase::Idle;
    }

    /// Append `text` and return every snapshot completed by it, in order.
    pub fn push(&mut self, text: &str) -> Vec<ActiveCuelistSet> {
        self.pending.push_str(text);

        let mut completed = Vec::new();
        let mut consumed = 0;
        while let Some(offset) = self.pending[consumed..].find(LINE_TERMINATOR) {
            let end = consumed + offset;
            let line = self.pending[consumed..end].to_owned();
            consumed = end + LINE_TERMINATOR.len();
            if let Some(snapshot) = self.handle_line(&line) {
                completed.push(snapshot);
            }
        }
        self.pending.drain(..consumed);

        if self.pending.len() > MAX_PENDING_BYTES {
            warn!(
                bytes = self.pending.len(),
                "poll accumulator: unterminated fragment exceeded limit, discarding"
            );
            self.pending.clear();
        }

        completed
    }

    fn handle_line(&mut self, line: &str) -> Option<ActiveCuelistSet> {
        let kind = classify_line(line);
        if self.reject_unsolicited && self.phase == PollPhase::Idle && kind != LineKind::Ignored {
            debug!(line, "poll accumulator: discarding line with no poll outstanding");
            return None;
        }

        match kind {
            LineKind::Ignored => None,
            LineKind::Cuelist(id) => {
                self.building.insert(id);
                None
            }
            LineKind::Unparseable => {
                debug!(line, "poll accumulator: skipping non-numeric line");
                None
            }
            LineKind::Terminator => {
                self.phase = PollPhase::Idle;
                let ids = std::mem::take(&mut self.building);
                debug!(count = ids.len(), "poll accumulator: snapshot complete");
                Some(ActiveCuelistSet::new(ids, Utc::now()))
            }
        }
    }
}
