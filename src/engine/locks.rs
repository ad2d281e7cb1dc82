//! Advisory per-document locks.
//!
//! Every read-modify-write against a path runs while holding that path's
//! lock, so concurrent mutations of one document inside this process
//! serialize instead of silently dropping an update. Other processes are
//! not coordinated.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

/// Registry of advisory locks keyed by canonical document path.
///
/// Entries nobody holds are dropped the next time a lock is handed out.
#[derive(Debug, Default)]
pub struct DocumentLocks {
    locks: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl DocumentLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Symlinks resolved. A file that does not exist yet is keyed by its
    /// canonical parent directory, so it keeps the same key once created.
    fn key(path: &Path) -> PathBuf {
        if let Ok(canonical) = std::fs::canonicalize(path) {
            return canonical;
        }
        let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
        match (absolute.parent(), absolute.file_name()) {
            (Some(parent), Some(name)) => std::fs::canonicalize(parent)
                .map(|dir| dir.join(name))
                .unwrap_or(absolute),
            _ => absolute,
        }
    }

    /// The lock guarding `path`, created on first use.
    pub fn lock_for(&self, path: &Path) -> Arc<Mutex<()>> {
        let key = Self::key(path);
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.retain(|held, lock| *held == key || Arc::strong_count(lock) > 1);
        Arc::clone(locks.entry(key).or_default())
    }

    /// Run `f` while holding the lock for `path`.
    pub fn with_lock<T>(&self, path: &Path, f: impl FnOnce() -> T) -> T {
        let lock = self.lock_for(path);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        f()
    }

    /// Number of paths currently tracked.
    pub fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
