//! Structured error types for engine and caller operations.

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::path::PathBuf;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (4xx-like)
    MissingRequiredField,
    InvalidFieldValue,
    InvalidState,
    SchemaInvalid,

    // Not found errors
    NotFound,
    SectionNotFound,
    BlockNotFound,
    TaskNotFound,

    // Conflict errors
    AlreadyExists,
    DataLossGuard,

    // Internal errors
    BackupFailed,
    IoError,
    InternalError,
}

/// Errors raised by the mutation engine and the operations built on it.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Document not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("Section '{header}' not found in {}", path.display())]
    SectionNotFound { path: PathBuf, header: String },

    #[error("Block not found in section '{header}' of {}", path.display())]
    BlockNotFound {
        path: PathBuf,
        header: String,
        record_id: Option<String>,
    },

    #[error("Document {} is missing required headers: {}", path.display(), missing.join(", "))]
    SchemaInvalid { path: PathBuf, missing: Vec<String> },

    #[error(
        "Refusing to rewrite {}: {proposed} records would replace {existing}",
        path.display()
    )]
    DataLossGuard {
        path: PathBuf,
        existing: usize,
        proposed: usize,
    },

    #[error("Failed to back up {}: {source}", path.display())]
    BackupFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("{0}")]
    AlreadyExists(String),

    #[error("{0}")]
    InvalidState(String),

    #[error("{field}: {reason}")]
    InvalidFieldValue { field: String, reason: String },

    #[error("{0} is required")]
    MissingRequiredField(String),

    #[error("{0}")]
    Internal(String),
}

impl EngineError {
    pub fn code(&self) -> ErrorCode {
        match self {
            EngineError::NotFound { .. } => ErrorCode::NotFound,
            EngineError::SectionNotFound { .. } => ErrorCode::SectionNotFound,
            EngineError::BlockNotFound { .. } => ErrorCode::BlockNotFound,
            EngineError::SchemaInvalid { .. } => ErrorCode::SchemaInvalid,
            EngineError::DataLossGuard { .. } => ErrorCode::DataLossGuard,
            EngineError::BackupFailed { .. } => ErrorCode::BackupFailed,
            EngineError::Io { .. } => ErrorCode::IoError,
            EngineError::TaskNotFound(_) => ErrorCode::TaskNotFound,
            EngineError::AlreadyExists(_) => ErrorCode::AlreadyExists,
            EngineError::InvalidState(_) => ErrorCode::InvalidState,
            EngineError::InvalidFieldValue { .. } => ErrorCode::InvalidFieldValue,
            EngineError::MissingRequiredField(_) => ErrorCode::MissingRequiredField,
            EngineError::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// Extra machine-readable context, when the variant carries any.
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            EngineError::SchemaInvalid { missing, .. } => {
                Some(serde_json::json!({ "missing": missing }))
            }
            EngineError::DataLossGuard {
                existing, proposed, ..
            } => Some(serde_json::json!({ "existing": existing, "proposed": proposed })),
            EngineError::BlockNotFound {
                header, record_id, ..
            } => Some(serde_json::json!({ "header": header, "record_id": record_id })),
            EngineError::SectionNotFound { header, .. } => {
                Some(serde_json::json!({ "header": header }))
            }
            EngineError::InvalidFieldValue { field, .. } => {
                Some(serde_json::json!({ "field": field }))
            }
            EngineError::MissingRequiredField(field) => {
                Some(serde_json::json!({ "field": field }))
            }
            _ => None,
        }
    }

    // Convenience constructors

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        EngineError::Io {
            path: path.into(),
            source,
        }
    }

    /// Map a read error, turning a missing file into `NotFound`.
    pub fn from_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            EngineError::NotFound { path }
        } else {
            EngineError::Io { path, source }
        }
    }

    pub fn invalid_value(field: &str, reason: impl Into<String>) -> Self {
        EngineError::InvalidFieldValue {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, EngineError::NotFound { .. })
    }
}

impl Serialize for EngineError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let details = self.details();
        let len = if details.is_some() { 3 } else { 2 };
        let mut state = serializer.serialize_struct("EngineError", len)?;
        state.serialize_field("code", &self.code())?;
        state.serialize_field("message", &self.to_string())?;
        if let Some(details) = details {
            state.serialize_field("details", &details)?;
        }
        state.end()
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = std::result::Result<T, EngineError>;
