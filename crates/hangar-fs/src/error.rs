//! # Design
//!
//! - Classify filesystem failures with explicit variants so callers never match on messages.
//! - Fold `io::ErrorKind::NotFound` into [`FsError::NotFound`] at the boundary.
//! - Keep messages constant; paths and operations travel as fields.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for filesystem capability calls.
pub type FsResult<T> = Result<T, FsError>;

/// Errors produced by the filesystem capability.
#[derive(Debug, Error)]
pub enum FsError {
    /// Target path does not exist.
    #[error("path not found")]
    NotFound {
        /// Path that was missing.
        path: PathBuf,
    },
    /// Requested path resolves outside of the server root.
    #[error("path escapes the server root")]
    OutsideSandbox {
        /// Raw path supplied by the caller.
        path: String,
    },
    /// Operation expected a directory.
    #[error("path is not a directory")]
    NotADirectory {
        /// Offending path.
        path: PathBuf,
    },
    /// Operation expected a regular file.
    #[error("path is a directory")]
    IsADirectory {
        /// Offending path.
        path: PathBuf,
    },
    /// Destination of a move already exists.
    #[error("destination already exists")]
    AlreadyExists {
        /// Existing destination path.
        path: PathBuf,
    },
    /// Attempted to delete the server root itself.
    #[error("server root may not be removed")]
    RootDeletion,
    /// Archive extension is not recognised.
    #[error("unsupported archive format")]
    UnsupportedArchive {
        /// Archive path.
        path: PathBuf,
    },
    /// Archive entry would land outside the extraction target.
    #[error("archive entry rejected")]
    UnsafeArchiveEntry {
        /// Entry name as recorded in the archive.
        entry: String,
    },
    /// No free copy name could be found next to the source.
    #[error("copy names exhausted")]
    CopyNamesExhausted {
        /// Source file being copied.
        path: PathBuf,
    },
    /// IO failures while interacting with the filesystem.
    #[error("filesystem io failure")]
    Io {
        /// Operation that triggered the IO failure.
        operation: &'static str,
        /// Path involved in the IO failure.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// Directory traversal failures.
    #[error("filesystem walk failure")]
    Walkdir {
        /// Operation that triggered the traversal.
        operation: &'static str,
        /// Path being traversed.
        path: PathBuf,
        /// Underlying walkdir error.
        source: walkdir::Error,
    },
    /// Zip archive failures.
    #[error("zip archive failure")]
    Zip {
        /// Operation that triggered the archive failure.
        operation: &'static str,
        /// Archive path.
        path: PathBuf,
        /// Underlying zip error.
        source: zip::result::ZipError,
    },
    /// A blocking filesystem task panicked or was cancelled.
    #[error("filesystem task failed")]
    Join {
        /// Operation that was running on the blocking pool.
        operation: &'static str,
        /// Underlying join error.
        source: tokio::task::JoinError,
    },
}

impl FsError {
    /// Whether the failure means the target does not exist.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        if source.kind() == io::ErrorKind::NotFound {
            return Self::NotFound { path };
        }
        Self::Io {
            operation,
            path,
            source,
        }
    }

    pub(crate) fn walkdir(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: walkdir::Error,
    ) -> Self {
        let path = path.into();
        if source
            .io_error()
            .is_some_and(|err| err.kind() == io::ErrorKind::NotFound)
        {
            return Self::NotFound { path };
        }
        Self::Walkdir {
            operation,
            path,
            source,
        }
    }

    pub(crate) fn zip(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: zip::result::ZipError,
    ) -> Self {
        Self::Zip {
            operation,
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;
    use walkdir::WalkDir;

    #[test]
    fn io_helper_folds_not_found() {
        let err = FsError::io("read", "missing", io::Error::from(io::ErrorKind::NotFound));
        assert!(err.is_not_found());

        let err = FsError::io("read", "denied", io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(matches!(err, FsError::Io { operation: "read", .. }));
        assert!(!err.is_not_found());
        assert!(err.source().is_some());
    }

    #[test]
    fn walkdir_helper_folds_missing_roots() -> Result<(), Box<dyn Error>> {
        let temp = tempfile::tempdir()?;
        let missing = temp.path().join("missing");
        let walk_error = WalkDir::new(&missing)
            .into_iter()
            .next()
            .and_then(Result::err)
            .ok_or_else(|| io::Error::other("expected walkdir error"))?;
        assert!(FsError::walkdir("walk", &missing, walk_error).is_not_found());
        Ok(())
    }

    #[test]
    fn zip_helper_keeps_source() {
        let err = FsError::zip("open", "a.zip", zip::result::ZipError::FileNotFound);
        assert!(matches!(err, FsError::Zip { .. }));
        assert!(err.source().is_some());
        assert_eq!(err.to_string(), "zip archive failure");
    }
}
