//! Command dispatcher: intent to console line.
//!
//! | Intent                                            | Line           |
//! |---------------------------------------------------|----------------|
//! | `clear_programmer`                                | `CLRCLR`       |
//! | `release_all_overrides`                           | `RAO`          |
//! | `release_all_cuelists`                            | `RAQL`         |
//! | `release_all_cuelists_dimmer_first`               | `RAQLDF`       |
//! | `release_all_cuelists_and_overrides_dimmer_first` | `RAQLODF`      |
//! | `release_all_cuelists_and_overrides`              | `RAQLO`        |
//! | `release_cuelist`                                 | `RQL n`        |
//! | `go_cuelist`                                      | `GQL n`        |
//! | `go_schedule`                                     | `GSC n`        |
//! | `go_cue`                                          | `GTQ list,cue` |
//! | `pause_cuelist`                                   | *(unmapped)*   |
//! | `raw`                                             | text verbatim  |
//! | `poll_active_cuelists`                            | `QLActive`     |
//!
//! The `\r\n` terminator is added by the codec, not here.

use serde::Serialize;
use tracing::{debug, warn};

use crate::models::command::Command;
use crate::{AppError, Result};

/// Line that asks the console for its active cue lists.
pub const POLL_COMMAND: &str = "QLActive";

/// What happened to a submitted command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchOutcome {
    /// The line was handed to the transport.
    Sent,
    /// Not connected; the line was discarded.
    Dropped,
    /// Accepted, but the console has no command for this intent.
    Unmapped,
}

/// Destination for rendered command lines.
///
/// Implemented by the supervisor's live link and by test doubles.
pub trait LineWriter {
    /// Whether the console connection is established.
    fn is_connected(&self) -> bool;

    /// Queue one line for writing. Returns `false` if it could not be queued.
    fn write_line(&mut self, line: String) -> bool;
}

/// Render `command` into its console line.
///
/// Returns `Ok(None)` for intents with no console command.
///
/// # Errors
///
/// Returns [`AppError::Command`] when a number parameter is empty or not
/// numeric, or raw text would span more than one line.
pub fn render(command: &Command) -> Result<Option<String>> {
    let line = match command {
        Command::ClearProgrammer => "CLRCLR".to_owned(),
        Command::ReleaseAllOverrides => "RAO".to_owned(),
        Command::ReleaseAllCuelists => "RAQL".to_owned(),
        Command::ReleaseAllCuelistsDimmerFirst => "RAQLDF".to_owned(),
        Command::ReleaseAllCuelistsAndOverridesDimmerFirst => "RAQLODF".to_owned(),
        Command::ReleaseAllCuelistsAndOverrides => "RAQLO".to_owned(),
        Command::ReleaseCuelist { cuelist } => format!("RQL {}", whole_number("cuelist", cuelist)?),
        Command::GoCuelist { cuelist } => format!("GQL {}", whole_number("cuelist", cuelist)?),
        Command::GoSchedule { schedule } => {
            format!("GSC {}", whole_number("schedule", schedule)?)
        }
        Command::GoCue { cuelist, cue } => format!(
            "GTQ {},{}",
            whole_number("cuelist", cuelist)?,
            cue_number(cue)?
        ),
        Command::PauseCuelist { cuelist } => {
            whole_number("cuelist", cuelist)?;
            return Ok(None);
        }
        Command::Raw { text } => {
            if text.contains(['\r', '\n']) {
                return Err(AppError::Command(
                    "raw command must be a single line".into(),
                ));
            }
            text.clone()
        }
        Command::PollActiveCuelists => POLL_COMMAND.to_owned(),
    };
    Ok(Some(line))
}

/// Render `command` and write it through `writer` if connected.
///
/// Being disconnected is not an error: the command is dropped and a
/// warning is logged.
///
/// # Errors
///
/// Returns [`AppError::Command`] if the parameters fail validation; nothing
/// is written in that case.
pub fn dispatch<W>(writer: &mut W, command: &Command) -> Result<DispatchOutcome>
where
    W: LineWriter + ?Sized,
{
    let intent = command.intent();
    let Some(line) = render(command)? else {
        warn!(intent, "dispatcher: no console command is mapped for this intent");
        return Ok(DispatchOutcome::Unmapped);
    };

    if !writer.is_connected() {
        warn!(intent, "dispatcher: console not connected, command dropped");
        return Ok(DispatchOutcome::Dropped);
    }

    if writer.write_line(line) {
        debug!(intent, "dispatcher: command written");
        Ok(DispatchOutcome::Sent)
    } else {
        warn!(intent, "dispatcher: transport refused the write, command dropped");
        Ok(DispatchOutcome::Dropped)
    }
}

// ── Private helpers ───────────────────────────────────────────────────────────

/// Validate a cue list or schedule number: ASCII digits only.
fn whole_number<'a>(field: &str, value: &'a str) -> Result<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AppError::Command(format!(
            "{field} must be a whole number, got '{value}'"
        )));
    }
    Ok(trimmed)
}

/// Validate a cue number: digits with at most one inner decimal point.
fn cue_number(value: &str) -> Result<&str> {
    let trimmed = value.trim();
    let mut parts = trimmed.splitn(2, '.');
    let whole = parts.next().unwrap_or_default();
    let fraction = parts.next();

    let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    let valid = digits(whole) && fraction.map_or(true, digits);
    if !valid {
        return Err(AppError::Command(format!(
            "cue must be a number like 7 or 7.5, got '{value}'"
        )));
    }
    Ok(trimmed)
}
