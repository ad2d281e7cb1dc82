//! HTTP mapping of engine errors.

use crate::error::{EngineError, ErrorCode};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use tracing::error;

/// Status code returned for an error code.
pub fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::NotFound | ErrorCode::TaskNotFound | ErrorCode::SectionNotFound => {
            StatusCode::NOT_FOUND
        }
        ErrorCode::BlockNotFound
        | ErrorCode::AlreadyExists
        | ErrorCode::DataLossGuard
        | ErrorCode::InvalidState => StatusCode::CONFLICT,
        ErrorCode::SchemaInvalid
        | ErrorCode::InvalidFieldValue
        | ErrorCode::MissingRequiredField => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorCode::BackupFailed | ErrorCode::IoError | ErrorCode::InternalError => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        let status = status_for(self.code());
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        }
        (status, Json(self)).into_response()
    }
}
