//! Plan task CRUD on top of the mutation engine.

use crate::codec::{PLAN_TEMPLATE, decode_plan, encode_task};
use crate::error::{EngineError, EngineResult};
use crate::types::{
    Actor, ORA_TASKS_HEADER, PlanSection, RewriteSummary, Task, TaskStatus, USER_TASKS_HEADER,
};
use crate::workspace::Workspace;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::info;

const PLAN_HEADERS: &[&str] = &[USER_TASKS_HEADER, ORA_TASKS_HEADER];
const MAX_ID_ATTEMPTS: usize = 100;

/// Input for [`create_task`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTask {
    /// Generated when absent.
    #[serde(default)]
    pub id: Option<String>,
    pub description: String,
    #[serde(default = "default_actor")]
    pub added_by: Actor,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub context: Option<String>,
    /// Defaults to the creator's section.
    #[serde(default)]
    pub section: Option<PlanSection>,
    #[serde(default)]
    pub status: Option<TaskStatus>,
}

fn default_actor() -> Actor {
    Actor::User
}

impl NewTask {
    pub fn new(description: impl Into<String>, added_by: Actor) -> Self {
        Self {
            id: None,
            description: description.into(),
            added_by,
            source: None,
            context: None,
            section: None,
            status: None,
        }
    }
}

/// Partial update for [`update_task`]. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskPatch {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<TaskStatus>,
    /// An empty string clears the context.
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub section: Option<PlanSection>,
}

fn single_line(field: &str, value: &str) -> EngineResult<()> {
    if value.contains(['\n', '\r']) {
        return Err(EngineError::invalid_value(field, "must be a single line"));
    }
    Ok(())
}

fn validate_task_id(id: &str) -> EngineResult<()> {
    if id.is_empty() {
        return Err(EngineError::MissingRequiredField("id".into()));
    }
    if id.chars().any(|c| c.is_whitespace() || c == '`') {
        return Err(EngineError::invalid_value(
            "id",
            "must not contain whitespace or backticks",
        ));
    }
    Ok(())
}

/// Field checks that keep a task encodable as one record block.
pub fn validate_task(task: &Task) -> EngineResult<()> {
    validate_task_id(&task.id)?;
    if task.description.trim().is_empty() {
        return Err(EngineError::MissingRequiredField("description".into()));
    }
    single_line("description", &task.description)?;
    single_line("source", &task.source)?;
    if let Some(context) = &task.context {
        single_line("context", context)?;
    }
    if let Some(promoted_to) = &task.promoted_to {
        single_line("promoted_to", promoted_to)?;
    }
    Ok(())
}

/// Generate a fresh petname id not present in `taken`.
pub fn generate_task_id(taken: &HashSet<String>) -> EngineResult<String> {
    use petname::{Generator, Petnames};

    for _ in 0..MAX_ID_ATTEMPTS {
        let id = Petnames::medium()
            .generate_one(2, "-")
            .unwrap_or_else(|| format!("task-{}", chrono::Utc::now().timestamp_millis()));
        if !taken.contains(&id) {
            return Ok(id);
        }
    }
    Err(EngineError::Internal(format!(
        "Failed to generate a unique task id after {MAX_ID_ATTEMPTS} attempts"
    )))
}

/// Every task in the plan. A missing plan has no tasks.
pub fn list_tasks(ws: &Workspace) -> EngineResult<Vec<Task>> {
    match ws.engine().read(&ws.plan_path()) {
        Ok(doc) => Ok(decode_plan(&doc.content)),
        Err(e) if e.is_not_found() => Ok(Vec::new()),
        Err(e) => Err(e),
    }
}

pub fn get_task(ws: &Workspace, id: &str) -> EngineResult<Task> {
    list_tasks(ws)?
        .into_iter()
        .find(|task| task.id == id)
        .ok_or_else(|| EngineError::TaskNotFound(id.to_string()))
}

/// Ensure the plan exists (created from the template) with both sections.
fn ensure_plan(ws: &Workspace) -> EngineResult<()> {
    let path = ws.plan_path();
    ws.engine()
        .validate_markdown_schema(&path, PLAN_HEADERS, Some(PLAN_TEMPLATE))?
        .into_result(&path)?;
    Ok(())
}

fn insert_task(ws: &Workspace, new: NewTask) -> EngineResult<Task> {
    ensure_plan(ws)?;
    let existing: HashSet<String> = list_tasks(ws)?.into_iter().map(|t| t.id).collect();

    let id = match new.id.filter(|id| !id.is_empty()) {
        Some(id) if existing.contains(&id) => {
            return Err(EngineError::AlreadyExists(format!(
                "Task '{id}' already exists"
            )));
        }
        Some(id) => id,
        None => generate_task_id(&existing)?,
    };

    let task = Task {
        id,
        description: new.description.trim().to_string(),
        added_by: new.added_by,
        status: new.status.unwrap_or_default(),
        source: new.source.unwrap_or_default(),
        context: new.context.filter(|c| !c.is_empty()),
        section: new
            .section
            .unwrap_or_else(|| PlanSection::for_actor(new.added_by)),
        promoted_to: None,
    };
    validate_task(&task)?;

    ws.engine().append_to_section(
        &ws.plan_path(),
        task.section.header(),
        &encode_task(&task),
        Some(&task.id),
    )?;
    info!(task_id = %task.id, section = task.section.as_str(), "Created task");
    Ok(task)
}

/// Add a task to its plan section. Explicit ids must be unique.
pub fn create_task(ws: &Workspace, new: NewTask) -> EngineResult<Task> {
    let actor = new.added_by.as_str();
    let description = new.description.clone();
    let result = insert_task(ws, new);
    ws.record(
        "create_task",
        &description,
        actor,
        &result,
        result.as_ref().ok().map(|t| t.id.as_str()),
    );
    result
}

fn apply_patch(mut task: Task, patch: TaskPatch) -> Task {
    if let Some(description) = patch.description {
        task.description = description.trim().to_string();
    }
    if let Some(status) = patch.status {
        task.status = status;
    }
    if let Some(context) = patch.context {
        task.context = (!context.is_empty()).then_some(context);
    }
    if let Some(source) = patch.source {
        task.source = source;
    }
    if let Some(section) = patch.section {
        task.section = section;
    }
    task
}

fn patch_task(ws: &Workspace, id: &str, patch: TaskPatch) -> EngineResult<Task> {
    let current = get_task(ws, id)?;
    let updated = apply_patch(current.clone(), patch);
    validate_task(&updated)?;

    let plan = ws.plan_path();
    let block = encode_task(&updated);
    if updated.section == current.section {
        ws.engine()
            .replace_record(&plan, current.section.header(), id, &block)?;
    } else {
        // Insert first so a failure never loses the task.
        ws.engine()
            .append_to_section(&plan, updated.section.header(), &block, Some(id))?;
        ws.engine()
            .replace_record(&plan, current.section.header(), id, "")?;
    }
    info!(task_id = id, status = updated.status.as_str(), "Updated task");
    Ok(updated)
}

/// Apply `patch` to the task `id`, moving it when its section changes.
pub fn update_task(ws: &Workspace, id: &str, patch: TaskPatch, actor: Actor) -> EngineResult<Task> {
    let result = patch_task(ws, id, patch);
    ws.record("update_task", id, actor.as_str(), &result, Some(id));
    result
}

/// Remove the task `id` from the plan.
pub fn delete_task(ws: &Workspace, id: &str, actor: Actor) -> EngineResult<Task> {
    let result = get_task(ws, id).and_then(|task| {
        ws.engine()
            .replace_record(&ws.plan_path(), task.section.header(), id, "")?;
        info!(task_id = id, "Deleted task");
        Ok(task)
    });
    ws.record("delete_task", id, actor.as_str(), &result, Some(id));
    result
}

/// Replace the whole task list, guarded against mass deletion.
pub fn rewrite_tasks(ws: &Workspace, tasks: &[Task], actor: Actor) -> EngineResult<RewriteSummary> {
    let result = (|| {
        let mut seen = HashSet::new();
        for task in tasks {
            validate_task(task)?;
            if !seen.insert(task.id.as_str()) {
                return Err(EngineError::invalid_value(
                    "tasks",
                    format!("duplicate task id '{}'", task.id),
                ));
            }
        }
        ws.engine().rewrite_tasks(&ws.plan_path(), tasks)
    })();
    ws.record(
        "rewrite_tasks",
        &format!("{} tasks", tasks.len()),
        actor.as_str(),
        &result,
        None,
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GuardConfig, StorageConfig};
    use tempfile::TempDir;

    fn workspace() -> (TempDir, Workspace) {
        let temp = TempDir::new().unwrap();
        let ws = Workspace::from_storage(StorageConfig::rooted_at(temp.path()), GuardConfig::default());
        (temp, ws)
    }

    fn with_id(id: &str, description: &str, actor: Actor) -> NewTask {
        NewTask {
            id: Some(id.to_string()),
            ..NewTask::new(description, actor)
        }
    }

    #[test]
    fn create_places_task_by_actor_and_creates_plan() {
        let (_temp, ws) = workspace();
        create_task(&ws, with_id("a", "Write docs", Actor::User)).unwrap();
        create_task(&ws, with_id("b", "Refactor", Actor::Agent)).unwrap();

        let tasks = list_tasks(&ws).unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].section, PlanSection::UserDefined);
        assert_eq!(tasks[1].section, PlanSection::OraSuggested);
    }

    #[test]
    fn generated_ids_are_unique_petnames() {
        let (_temp, ws) = workspace();
        let a = create_task(&ws, NewTask::new("One", Actor::User)).unwrap();
        let b = create_task(&ws, NewTask::new("Two", Actor::User)).unwrap();
        assert_ne!(a.id, b.id);
        assert!(a.id.contains('-'));
    }

    #[test]
    fn duplicate_and_invalid_input_is_rejected() {
        let (_temp, ws) = workspace();
        create_task(&ws, with_id("a", "Write docs", Actor::User)).unwrap();

        let dup = create_task(&ws, with_id("a", "Again", Actor::User)).unwrap_err();
        assert!(matches!(dup, EngineError::AlreadyExists(_)));

        let blank = create_task(&ws, with_id("c", "  ", Actor::User)).unwrap_err();
        assert!(matches!(blank, EngineError::MissingRequiredField(_)));

        let multi = create_task(&ws, with_id("d", "two\nlines", Actor::User)).unwrap_err();
        assert!(matches!(multi, EngineError::InvalidFieldValue { .. }));
        assert_eq!(list_tasks(&ws).unwrap().len(), 1);
    }

    #[test]
    fn update_patches_in_place_and_moves_sections() {
        let (_temp, ws) = workspace();
        create_task(&ws, with_id("a", "Write docs", Actor::User)).unwrap();
        create_task(&ws, with_id("b", "Other", Actor::User)).unwrap();

        let patch = TaskPatch {
            status: Some(TaskStatus::Done),
            context: Some("ship it".into()),
            ..TaskPatch::default()
        };
        let updated = update_task(&ws, "a", patch, Actor::User).unwrap();
        assert_eq!(updated.status, TaskStatus::Done);
        assert_eq!(get_task(&ws, "a").unwrap(), updated);

        let moved = TaskPatch {
            section: Some(PlanSection::OraSuggested),
            ..TaskPatch::default()
        };
        update_task(&ws, "a", moved, Actor::Agent).unwrap();
        let tasks = list_tasks(&ws).unwrap();
        assert_eq!(tasks.iter().map(|t| t.id.as_str()).collect::<Vec<_>>(), ["b", "a"]);
        assert_eq!(tasks[1].section, PlanSection::OraSuggested);
    }

    #[test]
    fn update_leaves_prose_mentioning_the_id_alone() {
        let (_temp, ws) = workspace();
        let plan = "# Plan\n\n### User-Defined Tasks\n- note: see `task-1` below\n- [ ] Real task\n  id: task-1\n  added_by: user\n  status: pending\n\n### Ora-Suggested Tasks\n";
        std::fs::write(ws.plan_path(), plan).unwrap();

        let patch = TaskPatch {
            status: Some(TaskStatus::Done),
            ..TaskPatch::default()
        };
        update_task(&ws, "task-1", patch, Actor::User).unwrap();

        let content = std::fs::read_to_string(ws.plan_path()).unwrap();
        assert!(content.contains("- note: see `task-1` below\n"));
        assert_eq!(content.matches("id: task-1").count(), 1);
        let tasks = list_tasks(&ws).unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].status, TaskStatus::Done);

        delete_task(&ws, "task-1", Actor::User).unwrap();
        let content = std::fs::read_to_string(ws.plan_path()).unwrap();
        assert!(content.contains("- note: see `task-1` below\n"));
        assert!(list_tasks(&ws).unwrap().is_empty());
    }

    #[test]
    fn delete_removes_only_the_target() {
        let (_temp, ws) = workspace();
        create_task(&ws, with_id("a", "One", Actor::User)).unwrap();
        create_task(&ws, with_id("b", "Two", Actor::User)).unwrap();

        delete_task(&ws, "a", Actor::User).unwrap();
        let ids: Vec<_> = list_tasks(&ws).unwrap().into_iter().map(|t| t.id).collect();
        assert_eq!(ids, ["b"]);

        let err = delete_task(&ws, "a", Actor::User).unwrap_err();
        assert!(matches!(err, EngineError::TaskNotFound(_)));
    }

    #[test]
    fn every_operation_is_logged() {
        let (_temp, ws) = workspace();
        create_task(&ws, with_id("a", "One", Actor::Agent)).unwrap();
        let _ = delete_task(&ws, "missing", Actor::User);

        let entries = ws.logger().unwrap().entries().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].action, "create_task");
        assert_eq!(entries[0].actor, "agent");
        assert_eq!(entries[1].result, crate::logging::Outcome::Failure);
    }

    #[test]
    fn rewrite_rejects_duplicate_ids() {
        let (_temp, ws) = workspace();
        create_task(&ws, with_id("a", "One", Actor::User)).unwrap();
        let task = get_task(&ws, "a").unwrap();
        let err = rewrite_tasks(&ws, &[task.clone(), task], Actor::User).unwrap_err();
        assert!(matches!(err, EngineError::InvalidFieldValue { .. }));
    }
}
