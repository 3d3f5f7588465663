//! Error types for batch and archive workflows.
//!
//! # Design
//! - Four outcomes only: bad input, missing target, policy conflict, anything else.
//! - Filesystem causes are kept as sources so handlers and logs can inspect them.

use hangar_fs::FsError;
use thiserror::Error;

/// Result alias for file operation workflows.
pub type FileOpsResult<T> = Result<T, FileOpsError>;

/// Classified failure of a file operation workflow.
#[derive(Debug, Error)]
pub enum FileOpsError {
    /// Request was rejected before any filesystem call.
    #[error("invalid file operation input")]
    InvalidInput {
        /// Request field at fault.
        field: &'static str,
        /// Machine-readable reason.
        reason: &'static str,
    },
    /// Target of a single-target operation does not exist.
    #[error("file operation target not found")]
    NotFound {
        /// Operation identifier.
        operation: &'static str,
        /// Underlying filesystem error.
        source: FsError,
    },
    /// Operation refused by disk space policy.
    #[error("file operation conflicts with disk space policy")]
    Conflict {
        /// Operation identifier.
        operation: &'static str,
        /// Machine-readable reason.
        reason: &'static str,
    },
    /// Any other filesystem failure.
    #[error("file operation failed")]
    Failure {
        /// Operation identifier.
        operation: &'static str,
        /// Underlying filesystem error.
        source: FsError,
    },
}

impl FileOpsError {
    /// Classify a filesystem error raised by a single-target operation.
    #[must_use]
    pub fn classify(operation: &'static str, source: FsError) -> Self {
        if source.is_not_found() {
            Self::NotFound { operation, source }
        } else {
            Self::Failure { operation, source }
        }
    }

    pub(crate) const fn empty(field: &'static str) -> Self {
        Self::InvalidInput {
            field,
            reason: "must not be empty",
        }
    }

    pub(crate) const fn no_space(operation: &'static str) -> Self {
        Self::Conflict {
            operation,
            reason: "insufficient disk space",
        }
    }

    /// Metric label for this outcome.
    #[must_use]
    pub const fn outcome(&self) -> &'static str {
        match self {
            Self::InvalidInput { .. } => "invalid",
            Self::NotFound { .. } => "not_found",
            Self::Conflict { .. } => "conflict",
            Self::Failure { .. } => "failure",
        }
    }
}
