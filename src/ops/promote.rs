//! Promotion of plan tasks into loop documents.
//!
//! A promotion touches two documents. The steps are recorded in a
//! write-ahead intent so a crash part-way through can be finished by
//! [`recover_intents`]. Every step checks whether its effect is already on
//! disk before writing.

use crate::codec::{decode_plan, encode_task};
use crate::document::find_record;
use crate::engine::intent::{PromotionIntent, PromotionStep};
use crate::error::{EngineError, EngineResult};
use crate::types::{
    Actor, CHAT_HEADER, EXECUTION_LOG_HEADER, LOOP_REQUIRED_HEADERS, LOOP_TASKS_HEADER, PromotionSummary,
    TaskStatus,
};
use crate::workspace::Workspace;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use tracing::{info, warn};

use super::tasks::get_task;

/// Skeleton of a freshly created loop document.
pub fn loop_template(loop_id: &str) -> String {
    format!("# {loop_id}\n\n{LOOP_TASKS_HEADER}\n\n{EXECUTION_LOG_HEADER}\n\n{CHAT_HEADER}\n")
}

/// Execution log line recorded for a promotion.
pub fn promotion_log_line(task_id: &str, timestamp: &str) -> String {
    format!("- {timestamp} promoted `{task_id}` from plan")
}

/// Outcome of replaying pending intents.
#[derive(Debug, Default, Serialize)]
pub struct RecoveryReport {
    pub recovered: Vec<PromotionSummary>,
    /// Intent ids that still could not be completed; they stay pending.
    pub failed: Vec<String>,
}

fn summary(intent: &PromotionIntent) -> PromotionSummary {
    PromotionSummary {
        task_id: intent.task_id.clone(),
        destination: intent.destination.clone(),
        destination_path: intent.destination_path.to_string_lossy().into_owned(),
    }
}

fn apply_step(ws: &Workspace, intent: &PromotionIntent, step: PromotionStep) -> EngineResult<()> {
    let engine = ws.engine();
    let dest = &intent.destination_path;
    match step {
        PromotionStep::AppendTask => {
            let doc = engine.read(dest)?;
            if find_record(&doc.content, LOOP_TASKS_HEADER, &intent.task_id).is_some() {
                return Ok(());
            }
            engine.append_to_section(dest, LOOP_TASKS_HEADER, &intent.task_block, Some(&intent.task_id))
        }
        PromotionStep::AppendLog => {
            let doc = engine.read(dest)?;
            if doc.section_body(EXECUTION_LOG_HEADER)?.contains(&intent.log_line) {
                return Ok(());
            }
            engine.append_to_section(dest, EXECUTION_LOG_HEADER, &intent.log_line, Some(&intent.task_id))
        }
        PromotionStep::MarkSource => {
            let doc = engine.read(&intent.source_path)?;
            let Some(mut task) = decode_plan(&doc.content)
                .into_iter()
                .find(|task| task.id == intent.task_id)
            else {
                warn!(task_id = %intent.task_id, "Promoted task no longer in plan; nothing to mark");
                return Ok(());
            };
            if task.status == TaskStatus::Promoted
                && task.promoted_to.as_deref() == Some(intent.destination.as_str())
            {
                return Ok(());
            }
            task.status = TaskStatus::Promoted;
            task.promoted_to = Some(intent.destination.clone());
            engine
                .replace_record(
                    &intent.source_path,
                    task.section.header(),
                    &task.id,
                    &encode_task(&task),
                )
                .map(|_| ())
        }
    }
}

/// Run every step not yet recorded, then retire the intent.
fn run_intent(ws: &Workspace, intent: &mut PromotionIntent) -> EngineResult<()> {
    for step in intent.remaining() {
        apply_step(ws, intent, step)?;
        ws.intents().mark_step(intent, step)?;
    }
    ws.intents().complete(intent)
}

fn promote(ws: &Workspace, task_id: &str, destination: &str) -> EngineResult<PromotionSummary> {
    let task = get_task(ws, task_id)?;
    if task.status == TaskStatus::Promoted {
        return Err(EngineError::InvalidState(format!(
            "Task '{}' was already promoted to {}",
            task_id,
            task.promoted_to.as_deref().unwrap_or("another loop")
        )));
    }

    let dest_path = ws.loop_path(destination)?;
    ws.engine()
        .validate_markdown_schema(&dest_path, LOOP_REQUIRED_HEADERS, Some(&loop_template(destination)))?
        .into_result(&dest_path)?;

    let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
    let mut intent = PromotionIntent::new(
        task_id,
        &ws.plan_path(),
        destination,
        &dest_path,
        encode_task(&task),
        promotion_log_line(task_id, &timestamp),
    );
    ws.intents().begin(&intent)?;
    run_intent(ws, &mut intent)?;

    info!(task_id, destination, "Promoted task");
    Ok(summary(&intent))
}

/// Move a plan task into the loop `destination`, creating the loop if needed.
pub fn promote_task(
    ws: &Workspace,
    task_id: &str,
    destination: &str,
    actor: Actor,
) -> EngineResult<PromotionSummary> {
    let result = promote(ws, task_id, destination);
    ws.record(
        "promote_task",
        &format!("promote to {destination}"),
        actor.as_str(),
        &result,
        Some(task_id),
    );
    result
}

/// Finish every promotion left incomplete by an earlier crash.
pub fn recover_intents(ws: &Workspace) -> EngineResult<RecoveryReport> {
    let mut report = RecoveryReport::default();
    for mut intent in ws.intents().pending()? {
        match run_intent(ws, &mut intent) {
            Ok(()) => {
                info!(intent = %intent.intent_id, task_id = %intent.task_id, "Recovered promotion");
                report.recovered.push(summary(&intent));
            }
            Err(error) => {
                warn!(intent = %intent.intent_id, error = %error, "Promotion recovery failed");
                report.failed.push(intent.intent_id.clone());
            }
        }
    }
    Ok(report)
}
