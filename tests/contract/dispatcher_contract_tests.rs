//! Contract tests for the intent → console line table.
//!
//! Every intent the link accepts is pinned to the exact text it writes.
//! Changing a line here changes what the console executes.

use onyx_link::dispatcher::{dispatch, render, DispatchOutcome, LineWriter, POLL_COMMAND};
use onyx_link::models::command::Command;
use onyx_link::AppError;

struct Wire {
    connected: bool,
    accept: bool,
    lines: Vec<String>,
}

impl Wire {
    fn connected() -> Self {
        Self {
            connected: true,
            accept: true,
            lines: Vec::new(),
        }
    }
}

impl LineWriter for Wire {
    fn is_connected(&self) -> bool {
        self.connected
    }

    fn write_line(&mut self, line: String) -> bool {
        if self.accept {
            self.lines.push(line);
        }
        self.accept
    }
}

fn s(value: &str) -> String {
    value.to_owned()
}

#[test]
fn every_mapped_intent_renders_its_line() {
    let table = [
        (Command::ClearProgrammer, "CLRCLR"),
        (Command::ReleaseAllOverrides, "RAO"),
        (Command::ReleaseAllCuelists, "RAQL"),
        (Command::ReleaseAllCuelistsDimmerFirst, "RAQLDF"),
        (Command::ReleaseAllCuelistsAndOverridesDimmerFirst, "RAQLODF"),
        (Command::ReleaseAllCuelistsAndOverrides, "RAQLO"),
        (Command::ReleaseCuelist { cuelist: s("4") }, "RQL 4"),
        (Command::GoCuelist { cuelist: s("12") }, "GQL 12"),
        (Command::GoSchedule { schedule: s("2") }, "GSC 2"),
        (
            Command::GoCue {
                cuelist: s("3"),
                cue: s("7"),
            },
            "GTQ 3,7",
        ),
        (
            Command::GoCue {
                cuelist: s("3"),
                cue: s("7.25"),
            },
            "GTQ 3,7.25",
        ),
        (Command::Raw { text: s("QLList") }, "QLList"),
        (Command::PollActiveCuelists, POLL_COMMAND),
    ];

    for (command, expected) in table {
        let line = render(&command).expect("valid").expect("mapped");
        assert_eq!(line, expected, "{}", command.intent());
    }
}

#[test]
fn poll_command_is_qlactive() {
    assert_eq!(POLL_COMMAND, "QLActive");
}

#[test]
fn pause_has_no_console_line() {
    let mut wire = Wire::connected();
    let outcome = dispatch(&mut wire, &Command::PauseCuelist { cuelist: s("3") }).expect("valid");

    assert_eq!(outcome, DispatchOutcome::Unmapped);
    assert!(wire.lines.is_empty());
}

#[test]
fn pause_still_validates_its_parameter() {
    let result = render(&Command::PauseCuelist { cuelist: s("x") });
    assert!(matches!(result, Err(AppError::Command(_))));
}

#[test]
fn injection_through_parameters_is_rejected() {
    let attempts = [
        Command::GoCuelist {
            cuelist: s("1\r\nRAQL"),
        },
        Command::ReleaseCuelist { cuelist: s("1 2") },
        Command::GoSchedule { schedule: s("1,2") },
        Command::GoCue {
            cuelist: s("1"),
            cue: s("2\nRAO"),
        },
        Command::Raw {
            text: s("CLRCLR\rRAO"),
        },
    ];

    for command in attempts {
        let mut wire = Wire::connected();
        let result = dispatch(&mut wire, &command);
        assert!(
            matches!(result, Err(AppError::Command(_))),
            "{} must be rejected",
            command.intent()
        );
        assert!(wire.lines.is_empty());
    }
}

#[test]
fn disconnected_dispatch_drops_without_writing() {
    let mut wire = Wire {
        connected: false,
        ..Wire::connected()
    };
    let outcome = dispatch(&mut wire, &Command::ReleaseAllCuelists).expect("valid");

    assert_eq!(outcome, DispatchOutcome::Dropped);
    assert!(wire.lines.is_empty());
}

#[test]
fn refused_write_is_reported_as_dropped() {
    let mut wire = Wire {
        accept: false,
        ..Wire::connected()
    };
    let outcome = dispatch(&mut wire, &Command::ClearProgrammer).expect("valid");
    assert_eq!(outcome, DispatchOutcome::Dropped);
}

#[test]
fn outcome_serializes_snake_case() {
    let json = serde_json::to_value(DispatchOutcome::Unmapped).expect("serialize");
    assert_eq!(json, "unmapped");
}
