//! Write-ahead intents for promotions spanning several documents.
//!
//! An intent is written before the first document is touched and removed
//! after the last step lands. Intents still on disk at startup are replayed;
//! each step is idempotent, so replaying a finished step is harmless.

use super::atomic::write_atomic;
use crate::error::{EngineError, EngineResult};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// One step of a promotion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromotionStep {
    /// Task block appended to the destination's task section.
    AppendTask,
    /// Promotion line appended to the destination's execution log.
    AppendLog,
    /// Source record rewritten to `status: promoted`.
    MarkSource,
}

impl PromotionStep {
    pub const ORDER: [PromotionStep; 3] = [
        PromotionStep::AppendTask,
        PromotionStep::AppendLog,
        PromotionStep::MarkSource,
    ];
}

/// A recorded, possibly incomplete, promotion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromotionIntent {
    pub intent_id: String,
    pub task_id: String,
    pub source_path: PathBuf,
    pub destination: String,
    pub destination_path: PathBuf,
    /// Exact block appended to the destination.
    pub task_block: String,
    /// Exact line appended to the destination's execution log.
    pub log_line: String,
    pub created_at: String,
    #[serde(default)]
    pub completed_steps: Vec<PromotionStep>,
}

impl PromotionIntent {
    pub fn new(
        task_id: &str,
        source_path: &Path,
        destination: &str,
        destination_path: &Path,
        task_block: String,
        log_line: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            intent_id: format!(
                "{}-{}",
                now.timestamp_millis(),
                sanitize_file_token(task_id)
            ),
            task_id: task_id.to_string(),
            source_path: source_path.to_path_buf(),
            destination: destination.to_string(),
            destination_path: destination_path.to_path_buf(),
            task_block,
            log_line,
            created_at: now.to_rfc3339_opts(SecondsFormat::Millis, true),
            completed_steps: Vec::new(),
        }
    }

    pub fn is_done(&self, step: PromotionStep) -> bool {
        self.completed_steps.contains(&step)
    }

    /// Steps not yet recorded as complete, in execution order.
    pub fn remaining(&self) -> Vec<PromotionStep> {
        PromotionStep::ORDER
            .into_iter()
            .filter(|step| !self.is_done(*step))
            .collect()
    }
}

fn sanitize_file_token(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Directory of pending intents, one JSON file each.
#[derive(Debug, Clone)]
pub struct IntentLog {
    dir: PathBuf,
}

impl IntentLog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, intent: &PromotionIntent) -> PathBuf {
        self.dir.join(format!("{}.json", intent.intent_id))
    }

    fn write(&self, intent: &PromotionIntent) -> EngineResult<()> {
        let json = serde_json::to_string_pretty(intent)
            .map_err(|e| EngineError::Internal(e.to_string()))?;
        write_atomic(&self.path_for(intent), &json)
    }

    /// Persist a new intent before any document is touched.
    pub fn begin(&self, intent: &PromotionIntent) -> EngineResult<()> {
        self.write(intent)?;
        debug!(intent = %intent.intent_id, task = %intent.task_id, "Recorded promotion intent");
        Ok(())
    }

    /// Record `step` as complete.
    pub fn mark_step(&self, intent: &mut PromotionIntent, step: PromotionStep) -> EngineResult<()> {
        if !intent.is_done(step) {
            intent.completed_steps.push(step);
        }
        self.write(intent)
    }

    /// Remove a finished intent.
    pub fn complete(&self, intent: &PromotionIntent) -> EngineResult<()> {
        let path = self.path_for(intent);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(EngineError::io(path, e)),
        }
    }

    /// All intents still on disk, oldest first. Unreadable files are skipped.
    pub fn pending(&self) -> EngineResult<Vec<PromotionIntent>> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(EngineError::io(&self.dir, e)),
        };

        let mut intents = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| EngineError::io(&self.dir, e))?.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            let parsed = std::fs::read_to_string(&path)
                .map_err(|e| e.to_string())
                .and_then(|json| {
                    serde_json::from_str::<PromotionIntent>(&json).map_err(|e| e.to_string())
                });
            match parsed {
                Ok(intent) => intents.push(intent),
                Err(error) => {
                    warn!(path = %path.display(), error = %error, "Skipping unreadable intent")
                }
            }
        }
        intents.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(intents)
    }
}
