use std::collections::BTreeSet;

use chrono::Utc;
use onyx_link::models::command::Command;
use onyx_link::models::cuelist::ActiveCuelistSet;
use onyx_link::models::state::ConnectionState;

// ── Command ───────────────────────────────────────────────────────────────────

#[test]
fn command_deserializes_from_intent_tag() {
    let cmd: Command =
        serde_json::from_str(r#"{"intent":"go_cue","cuelist":"3","cue":"7.5"}"#).expect("parse");
    assert_eq!(
        cmd,
        Command::GoCue {
            cuelist: "3".into(),
            cue: "7.5".into()
        }
    );
}

#[test]
fn legacy_action_names_are_accepted() {
    let cases = [
        (r#"{"intent":"clearclear"}"#, Command::ClearProgrammer),
        (r#"{"intent":"release_all_cl"}"#, Command::ReleaseAllCuelists),
        (
            r#"{"intent":"release_all_cl_df"}"#,
            Command::ReleaseAllCuelistsDimmerFirst,
        ),
        (
            r#"{"intent":"release_all_cl_or_df"}"#,
            Command::ReleaseAllCuelistsAndOverridesDimmerFirst,
        ),
        (
            r#"{"intent":"release_all_cl_or"}"#,
            Command::ReleaseAllCuelistsAndOverrides,
        ),
        (
            r#"{"intent":"release_cl","cuelist":"4"}"#,
            Command::ReleaseCuelist {
                cuelist: "4".into(),
            },
        ),
        (
            r#"{"intent":"go_list_cue","cuelist":"9"}"#,
            Command::GoCuelist {
                cuelist: "9".into(),
            },
        ),
        (
            r#"{"intent":"command","text":"RAO"}"#,
            Command::Raw { text: "RAO".into() },
        ),
        (
            r#"{"intent":"command","command":"RAO"}"#,
            Command::Raw { text: "RAO".into() },
        ),
    ];
    for (json, expected) in cases {
        let parsed: Command = serde_json::from_str(json).expect(json);
        assert_eq!(parsed, expected, "{json}");
    }
}

#[test]
fn unknown_intent_is_rejected() {
    let result = serde_json::from_str::<Command>(r#"{"intent":"blackout"}"#);
    assert!(result.is_err());
}

#[test]
fn missing_parameter_is_rejected() {
    let result = serde_json::from_str::<Command>(r#"{"intent":"go_cue","cuelist":"3"}"#);
    assert!(result.is_err());
}

#[test]
fn intent_name_matches_serialized_tag() {
    let commands = [
        Command::ClearProgrammer,
        Command::PauseCuelist {
            cuelist: "1".into(),
        },
        Command::PollActiveCuelists,
        Command::GoSchedule {
            schedule: "2".into(),
        },
    ];
    for cmd in commands {
        let value = serde_json::to_value(&cmd).expect("serialize");
        assert_eq!(value["intent"], cmd.intent());
    }
}

// ── ActiveCuelistSet ──────────────────────────────────────────────────────────

#[test]
fn initial_snapshot_is_empty_and_untimed() {
    let set = ActiveCuelistSet::default();
    assert!(set.is_empty());
    assert!(set.captured_at().is_none());
    assert!(!set.contains(1));
}

#[test]
fn snapshot_ids_are_sorted_and_unique() {
    let ids: BTreeSet<u32> = [12, 5, 12, 1].into_iter().collect();
    let set = ActiveCuelistSet::new(ids, Utc::now());

    assert_eq!(set.to_vec(), vec![1, 5, 12]);
    assert_eq!(set.len(), 3);
    assert!(set.contains(5));
}

#[test]
fn same_ids_ignores_capture_time() {
    let a = ActiveCuelistSet::new([5].into_iter().collect(), Utc::now());
    let b = ActiveCuelistSet::new([5].into_iter().collect(), Utc::now());
    let c = ActiveCuelistSet::new([6].into_iter().collect(), Utc::now());

    assert!(a.same_ids(&b));
    assert!(!a.same_ids(&c));
}

// ── ConnectionState ───────────────────────────────────────────────────────────

#[test]
fn only_connected_allows_writes() {
    assert!(ConnectionState::Connected.is_connected());
    assert!(!ConnectionState::Connecting.is_connected());
    assert!(!ConnectionState::Disconnected.is_connected());
    assert!(!ConnectionState::Errored.is_connected());
}

#[test]
fn state_serializes_snake_case() {
    let value = serde_json::to_value(ConnectionState::Errored).expect("serialize");
    assert_eq!(value, "errored");
    assert_eq!(ConnectionState::default(), ConnectionState::Disconnected);
}
