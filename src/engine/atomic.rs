//! Whole-file writes through a temp file in the target directory.

use crate::error::{EngineError, EngineResult};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Write `content` to `path` via temp file + fsync + rename.
///
/// Readers never observe a partially written document.
pub fn write_atomic(path: &Path, content: &str) -> EngineResult<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(|e| EngineError::io(dir, e))?;

    let mut temp = NamedTempFile::new_in(dir).map_err(|e| EngineError::io(dir, e))?;
    temp.write_all(content.as_bytes())
        .map_err(|e| EngineError::io(path, e))?;
    temp.as_file()
        .sync_all()
        .map_err(|e| EngineError::io(path, e))?;
    temp.persist(path)
        .map_err(|e| EngineError::io(path, e.error))?;
    Ok(())
}
