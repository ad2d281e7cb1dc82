//! Property-based tests for the record codec.
//!
//! Case counts follow `PROPTEST_CASES` (default 64).

use chrono::DateTime;
use plandoc::codec::{PLAN_TEMPLATE, decode_chat, decode_plan, encode, encode_chat, render_plan};
use plandoc::types::{Actor, CHAT_HEADER, ChatMessage, PlanSection, Task, TaskStatus};
use proptest::prelude::*;

fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(64);
    ProptestConfig::with_cases(cases)
}

/// Single-line text that cannot be mistaken for structure.
fn line() -> impl Strategy<Value = String> {
    "[A-Za-z0-9][A-Za-z0-9 ,.()!?'-]{0,40}".prop_map(|s| s.trim_end().to_string())
}

/// Field text that looks like structure: leading spaces, checkbox and
/// `key: value` prefixes, backticked tokens.
fn field_text() -> impl Strategy<Value = String> {
    (
        "[ ]{0,3}",
        prop_oneof![
            Just(""),
            Just("[x] "),
            Just("[ ] "),
            Just("key: "),
            Just("`task-1` "),
        ],
        "[A-Za-z0-9][A-Za-z0-9 ,.()!?'`:-]{0,40}",
    )
        .prop_map(|(lead, prefix, body)| format!("{lead}{prefix}{}", body.trim_end()))
}

fn task_id() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{0,15}"
}

fn actor() -> impl Strategy<Value = Actor> {
    prop_oneof![Just(Actor::User), Just(Actor::Agent)]
}

fn status() -> impl Strategy<Value = TaskStatus> {
    prop_oneof![
        Just(TaskStatus::Pending),
        Just(TaskStatus::Done),
        Just(TaskStatus::Rejected),
        Just(TaskStatus::Promoted),
    ]
}

fn task() -> impl Strategy<Value = Task> {
    (
        task_id(),
        field_text(),
        actor(),
        status(),
        proptest::option::of(field_text()),
        proptest::option::of(field_text()),
        prop_oneof![Just(PlanSection::UserDefined), Just(PlanSection::OraSuggested)],
        proptest::option::of(field_text()),
    )
        .prop_map(
            |(id, description, added_by, status, source, context, section, promoted_to)| Task {
                id,
                description,
                added_by,
                status,
                source: source.unwrap_or_default(),
                context,
                section,
                promoted_to,
            },
        )
}

/// Tasks with distinct ids, grouped the way `decode_plan` returns them.
fn task_list() -> impl Strategy<Value = Vec<Task>> {
    proptest::collection::vec(task(), 0..8).prop_map(|tasks| {
        let mut seen = std::collections::HashSet::new();
        let mut unique: Vec<Task> = tasks
            .into_iter()
            .filter(|t| seen.insert(t.id.clone()))
            .collect();
        unique.sort_by_key(|t| t.section == PlanSection::OraSuggested);
        unique
    })
}

/// `Z` or a `+HH:MM` / `-HH:MM` offset.
fn utc_offset() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("Z".to_string()),
        (-12i32..=14, prop_oneof![Just(0u32), Just(30)]).prop_map(|(hours, minutes)| {
            let sign = if hours < 0 { '-' } else { '+' };
            format!("{sign}{:02}:{minutes:02}", hours.abs())
        }),
    ]
}

fn timestamp() -> impl Strategy<Value = String> {
    (0u32..86_400, utc_offset()).prop_map(|(secs, offset)| {
        format!(
            "2024-05-01T{:02}:{:02}:{:02}{offset}",
            secs / 3600,
            (secs / 60) % 60,
            secs % 60
        )
    })
}

fn chat_message() -> impl Strategy<Value = ChatMessage> {
    (
        timestamp(),
        actor(),
        proptest::collection::vec(line(), 1..4),
    )
        .prop_map(|(timestamp, speaker, lines)| ChatMessage {
            timestamp,
            speaker,
            message: lines.join("\n"),
        })
}

/// A valid message or one whose timestamp does not parse.
fn any_chat_message() -> impl Strategy<Value = ChatMessage> {
    prop_oneof![
        3 => chat_message(),
        1 => (chat_message(), "[a-z]{1,8}( [0-9]{1,2})?").prop_map(|(mut msg, garbled)| {
            msg.timestamp = garbled;
            msg
        }),
    ]
}

proptest! {
    #![proptest_config(proptest_config())]

    #[test]
    fn fresh_plan_round_trips(tasks in task_list()) {
        let rendered = encode(&tasks, None);
        prop_assert_eq!(decode_plan(&rendered), tasks);
    }

    #[test]
    fn rerendering_keeps_surrounding_text(tasks in task_list(), note in line()) {
        let existing = format!("{PLAN_TEMPLATE}\n## Notes\n{note}\n");
        let rendered = render_plan(&tasks, &existing);
        prop_assert_eq!(decode_plan(&rendered), tasks.clone());
        let notes = format!("## Notes\n{note}\n");
        prop_assert!(rendered.ends_with(&notes));
        prop_assert_eq!(render_plan(&tasks, &rendered), rendered);
    }

    #[test]
    fn chat_blocks_round_trip(msg in chat_message()) {
        let decoded = decode_chat(&format!("{}\n", encode_chat(&msg)));
        prop_assert_eq!(decoded, vec![msg]);
    }

    #[test]
    fn chat_is_ordered_by_instant(messages in proptest::collection::vec(any_chat_message(), 0..40)) {
        let body: String = messages.iter().map(|m| format!("{}\n", encode_chat(m))).collect();
        let decoded = decode_chat(&format!("{CHAT_HEADER}\n{body}"));
        prop_assert_eq!(decoded.len(), messages.len());

        let parsed: Vec<_> = decoded
            .iter()
            .map(|m| DateTime::parse_from_rfc3339(&m.timestamp).ok())
            .collect();
        let valid = parsed.iter().take_while(|p| p.is_some()).count();
        prop_assert!(parsed[valid..].iter().all(Option::is_none));
        prop_assert!(parsed[..valid].windows(2).all(|w| w[0] <= w[1]));
        prop_assert!(
            decoded[valid..].windows(2).all(|w| w[0].timestamp <= w[1].timestamp)
        );
    }
}
