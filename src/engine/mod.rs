//! Mutation engine: section-scoped edits of markdown documents.
//!
//! Every operation is a read-modify-write of one whole file, performed while
//! holding that file's advisory lock and written back atomically. There is no
//! cross-call atomicity; multi-document callers use [`intent::IntentLog`].

pub mod atomic;
pub mod backup;
pub mod guard;
pub mod intent;
pub mod locks;
mod rewrite;

use crate::config::GuardConfig;
use crate::document::{
    Document, append_within, find_record, locate_record, read_document, splice,
};
use crate::error::{EngineError, EngineResult};
use crate::types::SchemaReport;
use atomic::write_atomic;
use locks::DocumentLocks;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

impl SchemaReport {
    /// Turn an invalid report into `SchemaInvalid` carrying every missing header.
    pub fn into_result(self, path: &Path) -> EngineResult<SchemaReport> {
        if self.valid {
            Ok(self)
        } else {
            Err(EngineError::SchemaInvalid {
                path: path.to_path_buf(),
                missing: self.errors,
            })
        }
    }
}

/// Section-targeted mutation engine.
#[derive(Debug)]
pub struct MutationEngine {
    locks: DocumentLocks,
    backups_dir: PathBuf,
    guard: GuardConfig,
}

impl MutationEngine {
    pub fn new(backups_dir: impl Into<PathBuf>, guard: GuardConfig) -> Self {
        Self {
            locks: DocumentLocks::new(),
            backups_dir: backups_dir.into(),
            guard,
        }
    }

    pub fn backups_dir(&self) -> &Path {
        &self.backups_dir
    }

    pub fn guard(&self) -> &GuardConfig {
        &self.guard
    }

    /// Read the current on-disk state of a document.
    pub fn read(&self, path: &Path) -> EngineResult<Document> {
        read_document(path)
    }

    /// Insert `text` at the end of the section under `header`.
    ///
    /// Fails with `SectionNotFound` when the header is absent. `id` is only
    /// used to correlate log output.
    pub fn append_to_section(
        &self,
        path: &Path,
        header: &str,
        text: &str,
        id: Option<&str>,
    ) -> EngineResult<()> {
        self.locks.with_lock(path, || {
            let doc = Document::read(path)?;
            let section = doc.section(header)?;
            let updated = append_within(&doc.content, &section, text);
            write_atomic(path, &updated)?;
            info!(path = %path.display(), header, record_id = ?id, "Appended to section");
            Ok(())
        })
    }

    /// Replace the first exact occurrence of `old` inside the section with `new`.
    ///
    /// `BlockNotFound` when `old` is not a substring of the section body; the
    /// file is not written in that case. An empty `old` appends `new`; an
    /// empty `new` deletes `old`.
    pub fn replace_in_section(
        &self,
        path: &Path,
        header: &str,
        old: &str,
        new: &str,
        id: Option<&str>,
    ) -> EngineResult<()> {
        self.locks.with_lock(path, || {
            let doc = Document::read(path)?;
            let section = doc.section(header)?;

            let updated = if old.is_empty() {
                if new.is_empty() {
                    debug!(path = %path.display(), header, "Empty replacement, nothing to do");
                    return Ok(());
                }
                append_within(&doc.content, &section, new)
            } else {
                let Some(found) = locate_record(section.body(&doc.content), old) else {
                    warn!(
                        path = %path.display(),
                        header,
                        record_id = ?id,
                        "Block not found; caller copy may be stale"
                    );
                    return Err(EngineError::BlockNotFound {
                        path: path.to_path_buf(),
                        header: header.to_string(),
                        record_id: id.map(str::to_string),
                    });
                };
                let start = section.body_start + found.start;
                let end = section.body_start + found.end;
                splice(&doc.content, start..end, new)
            };

            write_atomic(path, &updated)?;
            info!(path = %path.display(), header, record_id = ?id, "Replaced block in section");
            Ok(())
        })
    }

    /// Replace the record whose identifier is `id` under `header` with `new`.
    ///
    /// The record is located structurally, so formatting drift in the stored
    /// text does not matter. An empty `new` removes the record's lines.
    /// Returns the replaced record text.
    pub fn replace_record(
        &self,
        path: &Path,
        header: &str,
        id: &str,
        new: &str,
    ) -> EngineResult<String> {
        self.locks.with_lock(path, || {
            let doc = Document::read(path)?;
            doc.section(header)?;

            let Some(block) = find_record(&doc.content, header, id) else {
                return Err(EngineError::BlockNotFound {
                    path: path.to_path_buf(),
                    header: header.to_string(),
                    record_id: Some(id.to_string()),
                });
            };
            let previous = block.text(&doc.content).to_string();
            let updated = if new.is_empty() {
                splice(&doc.content, block.line_range, "")
            } else {
                splice(&doc.content, block.range, new.trim_end_matches(['\n', '\r']))
            };

            write_atomic(path, &updated)?;
            info!(path = %path.display(), header, record_id = id, deleted = new.is_empty(), "Replaced record");
            Ok(previous)
        })
    }

    /// Check that every header in `required` is present.
    ///
    /// When the document does not exist and `template` is given, it is first
    /// created from the template; without a template a missing document is
    /// `NotFound`. The report lists all missing headers, not just the first.
    pub fn validate_markdown_schema(
        &self,
        path: &Path,
        required: &[&str],
        template: Option<&str>,
    ) -> EngineResult<SchemaReport> {
        self.locks.with_lock(path, || {
            let doc = match (Document::read(path), template) {
                (Err(e), Some(template)) if e.is_not_found() => {
                    write_atomic(path, template)?;
                    info!(path = %path.display(), "Created document from template");
                    Document {
                        path: path.to_path_buf(),
                        content: template.to_string(),
                    }
                }
                (result, _) => result?,
            };

            let errors = doc.missing_headers(required);
            if !errors.is_empty() {
                warn!(path = %path.display(), missing = ?errors, "Document fails schema validation");
            }
            Ok(SchemaReport {
                valid: errors.is_empty(),
                errors,
            })
        })
    }

    /// Append `text` to the end of a file without reading it first.
    ///
    /// Used for documents that carry no sections. The file is created if
    /// needed and the text always starts on a fresh line.
    pub fn append_raw(&self, path: &Path, text: &str) -> EngineResult<()> {
        self.locks.with_lock(path, || {
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent).map_err(|e| EngineError::io(parent, e))?;
            }
            let mut file = std::fs::OpenOptions::new()
                .create(true)
                .read(true)
                .append(true)
                .open(path)
                .map_err(|e| EngineError::io(path, e))?;

            let needs_newline = ends_without_newline(&mut file).map_err(|e| EngineError::io(path, e))?;
            let mut chunk = String::with_capacity(text.len() + 2);
            if needs_newline {
                chunk.push('\n');
            }
            chunk.push_str(text.trim_end_matches(['\n', '\r']));
            chunk.push('\n');

            file.write_all(chunk.as_bytes())
                .map_err(|e| EngineError::io(path, e))?;
            info!(path = %path.display(), bytes = chunk.len(), "Appended raw text");
            Ok(())
        })
    }
}

/// Whether a non-empty file's last byte is something other than `\n`.
fn ends_without_newline(file: &mut std::fs::File) -> std::io::Result<bool> {
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(false);
    }
    file.seek(SeekFrom::Start(len - 1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] != b'\n')
}
