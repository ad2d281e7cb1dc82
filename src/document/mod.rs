//! Document and section model.
//!
//! Documents are plain markdown files. Nothing is cached: every operation
//! reads the current state from disk.

pub mod nodes;
pub mod section;

pub use nodes::{Node, NodeKind, RecordBlock, find_record, parse_nodes, record_blocks, section_records};
pub use section::{
    SectionRange, append_within, has_header, heading_level, locate_record, locate_section, splice,
};

use crate::error::{EngineError, EngineResult};
use std::path::{Path, PathBuf};

pub fn read_document(path: impl AsRef<Path>) -> EngineResult<Document> {
    Document::read(path)
}

/// Raw document content plus the path it was read from.
#[derive(Debug, Clone)]
pub struct Document {
    pub path: PathBuf,
    pub content: String,
}

impl Document {
    /// Read a document from disk. A missing file is `NotFound`.
    pub fn read(path: impl AsRef<Path>) -> EngineResult<Self> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| EngineError::from_read(path, e))?;
        Ok(Self {
            path: path.to_path_buf(),
            content,
        })
    }

    /// Locate `header`, failing with `SectionNotFound`.
    pub fn section(&self, header: &str) -> EngineResult<SectionRange> {
        locate_section(&self.content, header).ok_or_else(|| EngineError::SectionNotFound {
            path: self.path.clone(),
            header: header.to_string(),
        })
    }

    pub fn section_body(&self, header: &str) -> EngineResult<&str> {
        let section = self.section(header)?;
        Ok(section.body(&self.content))
    }

    /// Every header in `required` that does not appear in the document.
    pub fn missing_headers(&self, required: &[&str]) -> Vec<String> {
        required
            .iter()
            .filter(|header| !has_header(&self.content, header))
            .map(|header| header.to_string())
            .collect()
    }
}
