//! Resolved document layout plus the shared engine, intent log and logger.

use crate::config::{Config, GuardConfig, StorageConfig};
use crate::engine::MutationEngine;
use crate::engine::intent::IntentLog;
use crate::error::{EngineError, EngineResult};
use crate::logging::{InteractionLogger, Outcome};
use std::path::PathBuf;
use tracing::debug;

/// Everything an operation needs to reach the documents.
#[derive(Debug)]
pub struct Workspace {
    storage: StorageConfig,
    engine: MutationEngine,
    intents: IntentLog,
    logger: Option<InteractionLogger>,
}

impl Workspace {
    pub fn new(config: &Config) -> Self {
        Self::from_storage(config.storage.clone(), config.guard)
    }

    pub fn from_storage(storage: StorageConfig, guard: GuardConfig) -> Self {
        let engine = MutationEngine::new(storage.resolve(&storage.backups_dir), guard);
        let intents = IntentLog::new(storage.resolve(&storage.intents_dir));
        let logger = (!storage.interaction_log.as_os_str().is_empty())
            .then(|| InteractionLogger::new(storage.resolve(&storage.interaction_log)));
        debug!(docs_root = %storage.docs_root.display(), "Workspace ready");
        Self {
            storage,
            engine,
            intents,
            logger,
        }
    }

    pub fn storage(&self) -> &StorageConfig {
        &self.storage
    }

    pub fn engine(&self) -> &MutationEngine {
        &self.engine
    }

    pub fn intents(&self) -> &IntentLog {
        &self.intents
    }

    pub fn logger(&self) -> Option<&InteractionLogger> {
        self.logger.as_ref()
    }

    pub fn plan_path(&self) -> PathBuf {
        self.storage.resolve(&self.storage.plan_file)
    }

    /// `loops/<loop_id>.md`.
    pub fn loop_path(&self, loop_id: &str) -> EngineResult<PathBuf> {
        validate_doc_id("loop_id", loop_id)?;
        Ok(self
            .storage
            .resolve(&self.storage.loops_dir)
            .join(format!("{loop_id}.md")))
    }

    /// `threads/<thread_id>.md`.
    pub fn thread_path(&self, thread_id: &str) -> EngineResult<PathBuf> {
        validate_doc_id("thread_id", thread_id)?;
        Ok(self
            .storage
            .resolve(&self.storage.threads_dir)
            .join(format!("{thread_id}.md")))
    }

    /// Log the outcome of an operation to the interaction log, if enabled.
    pub fn record<T>(
        &self,
        action: &str,
        description: &str,
        actor: &str,
        result: &EngineResult<T>,
        record_id: Option<&str>,
    ) {
        if let Some(logger) = &self.logger {
            logger.log_interaction(action, description, actor, Outcome::of(result), record_id);
        }
    }
}

/// Document ids become file names: letters, digits, `-`, `_` and `.` only,
/// not starting with `.`.
pub fn validate_doc_id(field: &str, id: &str) -> EngineResult<()> {
    if id.is_empty() {
        return Err(EngineError::MissingRequiredField(field.to_string()));
    }
    if id.starts_with('.') {
        return Err(EngineError::invalid_value(field, "must not start with '.'"));
    }
    if let Some(bad) = id
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
    {
        return Err(EngineError::invalid_value(
            field,
            format!("invalid character {bad:?}"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn paths_resolve_under_docs_root() {
        let ws = Workspace::from_storage(StorageConfig::rooted_at("/srv/docs"), GuardConfig::default());
        assert_eq!(ws.plan_path(), Path::new("/srv/docs/plan.md"));
        assert_eq!(
            ws.loop_path("loop-99").unwrap(),
            Path::new("/srv/docs/loops/loop-99.md")
        );
        assert_eq!(
            ws.thread_path("t_1").unwrap(),
            Path::new("/srv/docs/threads/t_1.md")
        );
        assert_eq!(ws.engine().backups_dir(), Path::new("/srv/docs/.backups"));
    }

    #[test]
    fn traversal_ids_are_rejected() {
        let ws = Workspace::from_storage(StorageConfig::rooted_at("docs"), GuardConfig::default());
        assert!(matches!(
            ws.loop_path("../etc"),
            Err(EngineError::InvalidFieldValue { .. })
        ));
        assert!(matches!(
            ws.thread_path(""),
            Err(EngineError::MissingRequiredField(_))
        ));
        assert!(validate_doc_id("loop_id", "a/b").is_err());
    }

    #[test]
    fn empty_log_path_disables_logging() {
        let mut storage = StorageConfig::rooted_at("docs");
        storage.interaction_log = PathBuf::new();
        let ws = Workspace::from_storage(storage, GuardConfig::default());
        assert!(ws.logger().is_none());
    }
}
