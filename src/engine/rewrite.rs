//! Whole-document task list rewrite with backup and data-loss guard.

use super::MutationEngine;
use super::atomic::write_atomic;
use super::backup::backup_document;
use super::guard::check_data_loss;
use crate::codec::{decode_plan, render_plan};
use crate::document::Document;
use crate::error::EngineResult;
use crate::types::{RewriteSummary, Task};
use std::path::Path;
use tracing::{info, warn};

impl MutationEngine {
    /// Replace the full task list of the plan at `path` with `tasks`.
    ///
    /// 1. The current file is backed up; a failed copy aborts with nothing written.
    /// 2. The data-loss guard compares the existing and proposed record counts;
    ///    when it trips the write is refused and the backup is kept.
    /// 3. Otherwise both plan sections are re-rendered and the file is replaced.
    pub fn rewrite_tasks(&self, path: &Path, tasks: &[Task]) -> EngineResult<RewriteSummary> {
        self.locks.with_lock(path, || {
            let doc = Document::read(path)?;
            let backup_path = backup_document(path, &self.backups_dir)?;

            let existing = decode_plan(&doc.content).len();
            if let Err(e) = check_data_loss(&self.guard, path, existing, tasks.len()) {
                warn!(
                    path = %path.display(),
                    existing,
                    proposed = tasks.len(),
                    backup = %backup_path.display(),
                    "Data-loss guard refused rewrite"
                );
                return Err(e);
            }

            let rendered = render_plan(tasks, &doc.content);
            write_atomic(path, &rendered)?;

            info!(
                path = %path.display(),
                existing,
                written = tasks.len(),
                backup = %backup_path.display(),
                "Rewrote task list"
            );
            Ok(RewriteSummary {
                previous_count: existing,
                written_count: tasks.len(),
                backup_path: backup_path.to_string_lossy().into_owned(),
            })
        })
    }
}
