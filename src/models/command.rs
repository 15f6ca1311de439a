//! High-level console intents.
//!
//! A [`Command`] is built per operator action and immediately rendered by
//! the [dispatcher](crate::dispatcher). Parameters stay strings so that the
//! caller's variable substitution happens before the boundary check, not
//! after.
//!
//! The serde form is tagged by `intent`; the legacy action identifiers used
//! by existing button layouts (`clearclear`, `go_list_cue`, …) are accepted
//! as aliases.

use serde::{Deserialize, Serialize};

/// One operator intent plus its parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "intent", rename_all = "snake_case")]
pub enum Command {
    /// Clear the programmer (`CLRCLR`).
    #[serde(alias = "clearclear")]
    ClearProgrammer,
    /// Release all overrides (`RAO`).
    ReleaseAllOverrides,
    /// Release all cue lists (`RAQL`).
    #[serde(alias = "release_all_cl")]
    ReleaseAllCuelists,
    /// Release all cue lists, dimmer first (`RAQLDF`).
    #[serde(alias = "release_all_cl_df")]
    ReleaseAllCuelistsDimmerFirst,
    /// Release all cue lists and overrides, dimmer first (`RAQLODF`).
    #[serde(alias = "release_all_cl_or_df")]
    ReleaseAllCuelistsAndOverridesDimmerFirst,
    /// Release all cue lists and overrides (`RAQLO`).
    #[serde(alias = "release_all_cl_or")]
    ReleaseAllCuelistsAndOverrides,
    /// Release one cue list (`RQL n`).
    #[serde(alias = "release_cl")]
    ReleaseCuelist {
        /// Cue list number.
        cuelist: String,
    },
    /// Go on one cue list (`GQL n`).
    #[serde(alias = "go_list_cue")]
    GoCuelist {
        /// Cue list number.
        cuelist: String,
    },
    /// Go on a schedule (`GSC n`).
    GoSchedule {
        /// Schedule number.
        schedule: String,
    },
    /// Go to a specific cue in a cue list (`GTQ list,cue`).
    GoCue {
        /// Cue list number.
        cuelist: String,
        /// Cue number, optionally decimal.
        cue: String,
    },
    /// Pause a cue list. The console vocabulary has no mapped command for this.
    PauseCuelist {
        /// Cue list number.
        cuelist: String,
    },
    /// Free text passed through as one line.
    #[serde(alias = "command")]
    Raw {
        /// Line to send, without terminator.
        #[serde(alias = "command")]
        text: String,
    },
    /// Ask the console for the active cue lists (`QLActive`).
    PollActiveCuelists,
}

impl Command {
    /// Stable snake-case intent name, used in logs and control responses.
    #[must_use]
    pub fn intent(&self) -> &'static str {
        match self {
            Self::ClearProgrammer => "clear_programmer",
            Self::ReleaseAllOverrides => "release_all_overrides",
            Self::ReleaseAllCuelists => "release_all_cuelists",
            Self::ReleaseAllCuelistsDimmerFirst => "release_all_cuelists_dimmer_first",
            Self::ReleaseAllCuelistsAndOverridesDimmerFirst => {
                "release_all_cuelists_and_overrides_dimmer_first"
            }
            Self::ReleaseAllCuelistsAndOverrides => "release_all_cuelists_and_overrides",
            Self::ReleaseCuelist { .. } => "release_cuelist",
            Self::GoCuelist { .. } => "go_cuelist",
            Self::GoSchedule { .. } => "go_schedule",
            Self::GoCue { .. } => "go_cue",
            Self::PauseCuelist { .. } => "pause_cuelist",
            Self::Raw { .. } => "raw",
            Self::PollActiveCuelists => "poll_active_cuelists",
        }
    }
}
