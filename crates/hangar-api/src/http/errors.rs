//! RFC9457-style API error wrapper.

use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use hangar_fs::FsError;
use hangar_fsops::FileOpsError;
use tracing::error;

use crate::http::constants::{
    PROBLEM_BAD_REQUEST, PROBLEM_CONFLICT, PROBLEM_INTERNAL, PROBLEM_INVALID_INPUT,
    PROBLEM_NOT_FOUND,
};
use crate::models::{ProblemDetails, ProblemInvalidParam};

const MISSING_FILE: &str = "the requested file does not exist";

/// Structured API error with optional RFC9457 fields.
#[derive(Debug)]
pub(crate) struct ApiError {
    status: StatusCode,
    kind: &'static str,
    title: &'static str,
    detail: Option<String>,
    invalid_params: Option<Vec<ProblemInvalidParam>>,
}

impl ApiError {
    const fn new(status: StatusCode, kind: &'static str, title: &'static str) -> Self {
        Self {
            status,
            kind,
            title,
            detail: None,
            invalid_params: None,
        }
    }

    pub(crate) fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub(crate) fn with_invalid_params(mut self, params: Vec<ProblemInvalidParam>) -> Self {
        self.invalid_params = Some(params);
        self
    }

    pub(crate) fn internal(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            PROBLEM_INTERNAL,
            "internal server error",
        )
        .with_detail(message)
    }

    pub(crate) fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, PROBLEM_BAD_REQUEST, "bad request").with_detail(detail)
    }

    pub(crate) fn invalid_input(detail: impl Into<String>) -> Self {
        Self::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            PROBLEM_INVALID_INPUT,
            "invalid request",
        )
        .with_detail(detail)
    }

    pub(crate) fn not_found(detail: impl Into<String>) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            PROBLEM_NOT_FOUND,
            "resource not found",
        )
        .with_detail(detail)
    }

    pub(crate) fn conflict(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, PROBLEM_CONFLICT, "conflict").with_detail(detail)
    }

    /// Map a single-target filesystem failure; targets the caller may not see are reported as
    /// missing.
    pub(crate) fn from_fs(operation: &'static str, err: FsError) -> Self {
        match err {
            FsError::OutsideSandbox { .. }
            | FsError::IsADirectory { .. }
            | FsError::NotADirectory { .. } => Self::not_found(MISSING_FILE),
            other => FileOpsError::classify(operation, other).into(),
        }
    }

    #[cfg(test)]
    pub(crate) const fn status(&self) -> StatusCode {
        self.status
    }

    #[cfg(test)]
    pub(crate) fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }
}

impl From<FileOpsError> for ApiError {
    fn from(err: FileOpsError) -> Self {
        match err {
            FileOpsError::InvalidInput { field, reason } => {
                Self::invalid_input(format!("{field} {reason}")).with_invalid_params(vec![
                    ProblemInvalidParam {
                        pointer: format!("/{field}"),
                        message: reason.to_string(),
                    },
                ])
            }
            FileOpsError::NotFound { .. } => Self::not_found(MISSING_FILE),
            FileOpsError::Conflict { .. } => Self::conflict(
                "there is not enough disk space available to perform that action",
            ),
            FileOpsError::Failure { operation, source } => {
                error!(operation, error = %source, error_debug = ?source, "file operation failed");
                Self::internal("file operation failed")
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ProblemDetails {
            kind: self.kind.to_string(),
            title: self.title.to_string(),
            status: self.status.as_u16(),
            detail: self.detail,
            invalid_params: self.invalid_params,
        };
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::path::PathBuf;

    #[test]
    fn file_ops_errors_map_to_status_codes() {
        let invalid: ApiError = FileOpsError::InvalidInput {
            field: "files",
            reason: "must not be empty",
        }
        .into();
        assert_eq!(invalid.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(invalid.detail(), Some("files must not be empty"));

        let missing: ApiError = FileOpsError::NotFound {
            operation: "copy",
            source: FsError::NotFound {
                path: PathBuf::from("a"),
            },
        }
        .into();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let conflict: ApiError = FileOpsError::Conflict {
            operation: "compress",
            reason: "insufficient disk space",
        }
        .into();
        assert_eq!(conflict.status(), StatusCode::CONFLICT);

        let failure: ApiError = FileOpsError::Failure {
            operation: "delete",
            source: FsError::RootDeletion,
        }
        .into();
        assert_eq!(failure.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn hidden_targets_read_as_missing() {
        let outside = ApiError::from_fs(
            "contents",
            FsError::OutsideSandbox {
                path: "../etc/passwd".to_string(),
            },
        );
        assert_eq!(outside.status(), StatusCode::NOT_FOUND);

        let io = ApiError::from_fs(
            "contents",
            FsError::Io {
                operation: "open",
                path: PathBuf::from("a"),
                source: io::Error::other("boom"),
            },
        );
        assert_eq!(io.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn problem_body_includes_invalid_params() {
        let response = ApiError::invalid_input("files must not be empty")
            .with_invalid_params(vec![ProblemInvalidParam {
                pointer: "/files".to_string(),
                message: "must not be empty".to_string(),
            }])
            .into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
