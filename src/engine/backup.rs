//! Timestamped document backups.

use crate::error::{EngineError, EngineResult};
use chrono::{DateTime, SecondsFormat, Utc};
use std::fs::{File, OpenOptions};
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

const MAX_NAME_ATTEMPTS: u32 = 1000;

/// `<file name>.<ISO timestamp with ':' replaced by '-'>.bak`
pub fn backup_file_name(path: &Path, at: DateTime<Utc>) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    let stamp = at.to_rfc3339_opts(SecondsFormat::Millis, true).replace(':', "-");
    format!("{}.{}.bak", name, stamp)
}

/// Copy `path` into `backups_dir`, returning the backup location.
///
/// A missing source is `NotFound`; any other failure is `BackupFailed`.
pub fn backup_document(path: &Path, backups_dir: &Path) -> EngineResult<PathBuf> {
    backup_document_at(path, backups_dir, Utc::now())
}

fn backup_document_at(path: &Path, backups_dir: &Path, at: DateTime<Utc>) -> EngineResult<PathBuf> {
    let mut original = File::open(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => EngineError::NotFound {
            path: path.to_path_buf(),
        },
        _ => EngineError::BackupFailed {
            path: path.to_path_buf(),
            source: e,
        },
    })?;
    let failed = |source: io::Error| EngineError::BackupFailed {
        path: path.to_path_buf(),
        source,
    };

    std::fs::create_dir_all(backups_dir).map_err(failed)?;
    let (target, mut file) = create_unique(backups_dir, &backup_file_name(path, at)).map_err(failed)?;
    io::copy(&mut original, &mut file).map_err(failed)?;
    file.sync_all().map_err(failed)?;
    Ok(target)
}

/// Open `name` in `dir` for writing without clobbering an existing backup.
/// Taken names get a `-1`, `-2`, ... suffix before `.bak`.
fn create_unique(dir: &Path, name: &str) -> io::Result<(PathBuf, File)> {
    let stem = name.strip_suffix(".bak").unwrap_or(name);
    for attempt in 0..MAX_NAME_ATTEMPTS {
        let candidate = if attempt == 0 {
            dir.join(name)
        } else {
            dir.join(format!("{stem}-{attempt}.bak"))
        };
        match OpenOptions::new().write(true).create_new(true).open(&candidate) {
            Ok(file) => return Ok((candidate, file)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e),
        }
    }
    Err(io::Error::new(
        ErrorKind::AlreadyExists,
        format!("no free backup name for {name}"),
    ))
}
