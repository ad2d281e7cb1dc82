//! Task block encoding and plan document scanning.

use crate::document::{RecordBlock, append_within, find_record, locate_section, section_records, splice};
use crate::types::{Actor, PlanSection, Task, TaskStatus};
use regex_lite::Regex;
use std::sync::LazyLock;
use tracing::debug;

static CHECKBOX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[([ xX])\]\s?(.*)$").expect("valid checkbox regex"));

/// Minimal plan document holding both task sections.
pub const PLAN_TEMPLATE: &str = "# Plan\n\n### User-Defined Tasks\n\n### Ora-Suggested Tasks\n";

fn field_line(key: &str, value: &str) -> String {
    if value.is_empty() {
        format!("  {}:", key)
    } else {
        format!("  {}: {}", key, value)
    }
}

/// Render a task as its canonical checklist block (no trailing newline).
pub fn encode_task(task: &Task) -> String {
    let checkbox = if task.status == TaskStatus::Done { 'x' } else { ' ' };
    let mut lines = vec![
        format!("- [{}] {}", checkbox, task.description),
        field_line("id", &task.id),
        field_line("added_by", task.added_by.as_str()),
        field_line("status", task.status.as_str()),
        field_line("source", &task.source),
    ];
    if let Some(ref context) = task.context {
        lines.push(field_line("context", context));
    }
    if let Some(ref promoted_to) = task.promoted_to {
        lines.push(field_line("promoted_to", promoted_to));
    }
    lines.join("\n")
}

/// Decode one record block into a task.
///
/// `section` is the plan section the block was found under; when `None` the
/// block's own `section:` field is used, falling back to the creator's default.
pub fn decode_task_block(block: &RecordBlock, section: Option<PlanSection>) -> Option<Task> {
    let caps = CHECKBOX.captures(&block.bullet)?;
    let Some(id) = block.field("id") else {
        debug!(bullet = %block.bullet, "Skipping checklist item without id");
        return None;
    };
    let checked = !caps[1].trim().is_empty();

    let added_by = block
        .field("added_by")
        .and_then(Actor::from_str)
        .unwrap_or(Actor::User);
    let status = block
        .field("status")
        .and_then(TaskStatus::from_str)
        .unwrap_or(if checked {
            TaskStatus::Done
        } else {
            TaskStatus::Pending
        });
    let section = section
        .or_else(|| block.field("section").and_then(PlanSection::from_str))
        .unwrap_or_else(|| PlanSection::for_actor(added_by));

    Some(Task {
        id: id.to_string(),
        description: caps[2].to_string(),
        added_by,
        status,
        source: block.field("source").unwrap_or_default().to_string(),
        context: block.field("context").map(str::to_string),
        section,
        promoted_to: block.field("promoted_to").map(str::to_string),
    })
}

/// Decode every task from both plan sections, in document order per section.
pub fn decode_plan(content: &str) -> Vec<Task> {
    PlanSection::ALL
        .iter()
        .flat_map(|section| {
            section_records(content, section.header())
                .unwrap_or_default()
                .into_iter()
                .filter_map(move |block| decode_task_block(&block, Some(*section)))
        })
        .collect()
}

/// Decode the tasks embedded under a single `header` (e.g. a loop's task list).
pub fn decode_section(content: &str, header: &str) -> Vec<Task> {
    section_records(content, header)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|block| decode_task_block(&block, None))
        .collect()
}

/// Append `header` at EOF when the document does not carry it.
fn ensure_header(content: &mut String, header: &str) {
    if locate_section(content, header).is_some() {
        return;
    }
    if !content.is_empty() {
        if !content.ends_with('\n') {
            content.push('\n');
        }
        content.push('\n');
    }
    content.push_str(header);
    content.push('\n');
}

fn append_to(content: &str, header: &str, text: &str) -> String {
    let mut content = content.to_string();
    ensure_header(&mut content, header);
    match locate_section(&content, header) {
        Some(section) => append_within(&content, &section, text),
        None => content,
    }
}

fn locate_task(content: &str, id: &str) -> Option<(PlanSection, RecordBlock)> {
    PlanSection::ALL.iter().find_map(|section| {
        find_record(content, section.header(), id).map(|block| (*section, block))
    })
}

/// Render `tasks` into a plan document.
///
/// Without `existing` a fresh plan is produced. With `existing`, only the
/// given tasks are (re)rendered: a task already present is replaced in place
/// (or moved when its section changed), a new task is appended to its
/// section. All unrelated text is preserved.
pub fn encode(tasks: &[Task], existing: Option<&str>) -> String {
    let Some(existing) = existing else {
        return render_plan(tasks, PLAN_TEMPLATE);
    };

    let mut content = existing.to_string();
    for task in tasks {
        let block_text = encode_task(task);
        content = match locate_task(&content, &task.id) {
            Some((section, block)) if section == task.section => {
                splice(&content, block.range, &block_text)
            }
            Some((_, block)) => {
                let removed = splice(&content, block.line_range, "");
                append_to(&removed, task.section.header(), &block_text)
            }
            None => append_to(&content, task.section.header(), &block_text),
        };
    }
    content
}

/// Replace the task lists of both plan sections with exactly `tasks`.
///
/// Non-task text inside the sections and everything outside them is kept.
pub fn render_plan(tasks: &[Task], existing: &str) -> String {
    let mut content = existing.to_string();
    for section in PlanSection::ALL {
        let header = section.header();
        ensure_header(&mut content, header);

        let mut blocks = section_records(&content, header).unwrap_or_default();
        blocks.retain(|block| decode_task_block(block, Some(section)).is_some());
        for block in blocks.iter().rev() {
            content = splice(&content, block.line_range.clone(), "");
        }

        for task in tasks.iter().filter(|task| task.section == section) {
            content = append_to(&content, header, &encode_task(task));
        }
    }
    content
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: &str, section: PlanSection) -> Task {
        Task {
            id: id.to_string(),
            description: format!("Do {}", id),
            added_by: Actor::User,
            status: TaskStatus::Pending,
            source: "roadmap".to_string(),
            context: None,
            section,
            promoted_to: None,
        }
    }

    #[test]
    fn encodes_canonical_block() {
        let mut t = task("task-1", PlanSection::UserDefined);
        t.context = Some("phase 2".into());
        assert_eq!(
            encode_task(&t),
            "- [ ] Do task-1\n  id: task-1\n  added_by: user\n  status: pending\n  source: roadmap\n  context: phase 2"
        );
    }

    #[test]
    fn done_tasks_are_checked() {
        let mut t = task("task-1", PlanSection::UserDefined);
        t.status = TaskStatus::Done;
        assert!(encode_task(&t).starts_with("- [x] "));
    }

    #[test]
    fn roundtrip_preserves_every_field() {
        let t = Task {
            id: "task-7".into(),
            description: "Ship the `codec`: carefully".into(),
            added_by: Actor::Agent,
            status: TaskStatus::Promoted,
            source: "".into(),
            context: Some("".into()),
            section: PlanSection::OraSuggested,
            promoted_to: Some("loop-99".into()),
        };
        assert_eq!(decode_plan(&encode(&[t.clone()], None)), vec![t]);
    }

    #[test]
    fn decode_tags_section_from_heading() {
        let plan = encode(
            &[
                task("a", PlanSection::UserDefined),
                task("b", PlanSection::OraSuggested),
            ],
            None,
        );
        let tasks = decode_plan(&plan);
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].section, PlanSection::UserDefined);
        assert_eq!(tasks[1].section, PlanSection::OraSuggested);
    }

    #[test]
    fn status_falls_back_to_checkbox() {
        let doc = "### User-Defined Tasks\n- [x] legacy\n  id: old-1\n";
        let tasks = decode_plan(doc);
        assert_eq!(tasks[0].status, TaskStatus::Done);
        assert_eq!(tasks[0].source, "");
    }

    #[test]
    fn items_without_id_are_skipped() {
        let doc = "### User-Defined Tasks\n- [ ] no id here\n- plain bullet\n";
        assert!(decode_plan(doc).is_empty());
    }

    #[test]
    fn encode_with_existing_preserves_unrelated_text() {
        let original = encode(&[task("a", PlanSection::UserDefined)], None);
        let original = format!("{}\n## Notes\nkeep me\n", original);

        let mut updated = task("a", PlanSection::UserDefined);
        updated.status = TaskStatus::Rejected;
        let out = encode(&[updated.clone(), task("b", PlanSection::UserDefined)], Some(&original));

        assert!(out.contains("## Notes\nkeep me\n"));
        let tasks = decode_plan(&out);
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0], updated);
        assert_eq!(tasks[1].id, "b");
    }

    #[test]
    fn encode_with_existing_moves_changed_section() {
        let original = encode(&[task("a", PlanSection::UserDefined)], None);
        let moved = task("a", PlanSection::OraSuggested);
        let out = encode(&[moved.clone()], Some(&original));
        assert_eq!(decode_plan(&out), vec![moved]);
    }

    #[test]
    fn encode_adds_missing_section_header() {
        let out = encode(&[task("a", PlanSection::OraSuggested)], Some("# Plan\n"));
        assert!(out.contains("### Ora-Suggested Tasks\n- [ ] Do a"));
    }

    #[test]
    fn render_plan_replaces_task_lists() {
        let original = encode(
            &[
                task("a", PlanSection::UserDefined),
                task("b", PlanSection::UserDefined),
                task("c", PlanSection::OraSuggested),
            ],
            None,
        );
        let original = original.replace(
            "### User-Defined Tasks\n",
            "### User-Defined Tasks\nIntro prose.\n",
        );
        let out = render_plan(&[task("z", PlanSection::OraSuggested)], &original);
        let tasks = decode_plan(&out);
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, "z");
        assert!(out.contains("Intro prose."));
    }

    #[test]
    fn decode_section_infers_section_from_creator() {
        let doc = "## 🔧 Tasks\n- [ ] agent idea\n  id: t-9\n  added_by: agent\n  status: pending\n  source: chat\n";
        let tasks = decode_section(doc, "## 🔧 Tasks");
        assert_eq!(tasks[0].section, PlanSection::OraSuggested);
        assert_eq!(tasks[0].source, "chat");
    }
}
