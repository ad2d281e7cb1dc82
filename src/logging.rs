//! Interaction log: one JSON line per mutation, for audit.
//!
//! Logging is best-effort. A failed write is reported through `tracing` and
//! counted, but never fails the mutation that triggered it.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{
    Mutex, PoisonError,
    atomic::{AtomicU64, Ordering},
};
use tracing::{debug, warn};

/// Outcome recorded with an interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success,
    Failure,
}

impl Outcome {
    pub fn of<T, E>(result: &Result<T, E>) -> Self {
        if result.is_ok() {
            Outcome::Success
        } else {
            Outcome::Failure
        }
    }
}

/// A single line of the interaction log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionEntry {
    pub timestamp: String,
    pub action: String,
    pub description: String,
    pub actor: String,
    pub result: Outcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_id: Option<String>,
}

/// Append-only JSON-lines logger with a failure counter.
#[derive(Debug)]
pub struct InteractionLogger {
    path: PathBuf,
    write_lock: Mutex<()>,
    failures: AtomicU64,
}

impl InteractionLogger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
            failures: AtomicU64::new(0),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record an interaction. Never fails.
    pub fn log_interaction(
        &self,
        action: &str,
        description: &str,
        actor: &str,
        result: Outcome,
        record_id: Option<&str>,
    ) {
        let entry = InteractionEntry {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            action: action.to_string(),
            description: description.to_string(),
            actor: actor.to_string(),
            result,
            record_id: record_id.map(str::to_string),
        };

        match self.append(&entry) {
            Ok(()) => debug!(action, actor, record_id = ?record_id, "Logged interaction"),
            Err(error) => {
                let failures = self.failures.fetch_add(1, Ordering::Relaxed) + 1;
                warn!(
                    path = %self.path.display(),
                    action,
                    error = %error,
                    failures,
                    "Failed to write interaction log"
                );
            }
        }
    }

    /// Number of entries that could not be written since startup.
    pub fn failure_count(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    fn append(&self, entry: &InteractionEntry) -> anyhow::Result<()> {
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');

        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }

    /// Read back every parseable entry. Malformed lines are skipped.
    pub fn entries(&self) -> anyhow::Result<Vec<InteractionEntry>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        Ok(content
            .lines()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect())
    }
}
