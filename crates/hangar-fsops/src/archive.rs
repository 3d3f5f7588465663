//! Space-guarded compress and decompress.
//!
//! Both directions check capacity before writing, then act. The check and the write are not
//! atomic with respect to other requests on the same server.

use hangar_fs::{ARCHIVE_MIMETYPE, FileStat, Filesystem};
use hangar_telemetry::Metrics;
use tracing::{info, warn};

use crate::error::{FileOpsError, FileOpsResult};

const COMPRESS: &str = "compress";
const DECOMPRESS: &str = "decompress";

/// Archive requests for a server filesystem.
#[derive(Clone)]
pub struct ArchiveWorkflow {
    metrics: Metrics,
}

impl ArchiveWorkflow {
    /// Build a workflow that records outcomes in `metrics`.
    #[must_use]
    pub const fn new(metrics: Metrics) -> Self {
        Self { metrics }
    }

    /// Pack `files` (relative to `root`) into a new archive.
    ///
    /// The capacity check is the server-wide headroom check; it does not look at the size of
    /// `files`.
    ///
    /// # Errors
    ///
    /// - [`FileOpsError::InvalidInput`] when `files` is empty.
    /// - [`FileOpsError::Conflict`] when the server has no headroom; nothing is written.
    /// - [`FileOpsError::Failure`] for any filesystem error.
    pub async fn compress(
        &self,
        fs: &dyn Filesystem,
        root: &str,
        files: &[String],
    ) -> FileOpsResult<FileStat> {
        if files.is_empty() {
            return Err(FileOpsError::empty("files"));
        }
        let result = Self::compress_checked(fs, root, files).await;
        self.record(COMPRESS, root, result.as_ref().err());
        result
    }

    async fn compress_checked(
        fs: &dyn Filesystem,
        root: &str,
        files: &[String],
    ) -> FileOpsResult<FileStat> {
        if !fs.has_space_available().await {
            return Err(FileOpsError::no_space(COMPRESS));
        }
        let stat = fs
            .compress(root, files)
            .await
            .map_err(|source| FileOpsError::Failure {
                operation: COMPRESS,
                source,
            })?;
        info!(root, archive = %stat.name, size = stat.size, "archive created");
        Ok(stat.with_mimetype(ARCHIVE_MIMETYPE))
    }

    /// Extract `file` (relative to `root`) into `root`.
    ///
    /// # Errors
    ///
    /// - [`FileOpsError::NotFound`] when the archive does not exist.
    /// - [`FileOpsError::Conflict`] when its uncompressed size exceeds the headroom.
    /// - [`FileOpsError::Failure`] for any other filesystem error, including a failed size
    ///   inspection.
    pub async fn decompress(&self, fs: &dyn Filesystem, root: &str, file: &str) -> FileOpsResult<()> {
        let result = Self::decompress_checked(fs, root, file).await;
        self.record(DECOMPRESS, root, result.as_ref().err());
        result
    }

    async fn decompress_checked(fs: &dyn Filesystem, root: &str, file: &str) -> FileOpsResult<()> {
        let fits = fs
            .space_available_for_decompression(root, file)
            .await
            .map_err(|err| FileOpsError::classify(DECOMPRESS, err))?;
        if !fits {
            return Err(FileOpsError::no_space(DECOMPRESS));
        }
        fs.decompress(root, file)
            .await
            .map_err(|err| FileOpsError::classify(DECOMPRESS, err))?;
        info!(root, archive = file, "archive extracted");
        Ok(())
    }

    fn record(&self, operation: &'static str, root: &str, error: Option<&FileOpsError>) {
        let outcome = error.map_or("success", FileOpsError::outcome);
        self.metrics.inc_archive_operation(operation, outcome);
        if let Some(err) = error {
            warn!(operation, root, outcome, error = %err, "archive request rejected");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::{FakeFilesystem, Script};
    use anyhow::Result;
    use std::sync::atomic::Ordering;

    fn workflow() -> Result<(ArchiveWorkflow, Metrics)> {
        let metrics = Metrics::new()?;
        Ok((ArchiveWorkflow::new(metrics.clone()), metrics))
    }

    fn files() -> Vec<String> {
        vec!["world".to_string(), "server.properties".to_string()]
    }

    #[tokio::test]
    async fn compress_tags_result_with_archive_mimetype() -> Result<()> {
        let (workflow, _) = workflow()?;
        let fs = FakeFilesystem::new();
        let stat = workflow.compress(&fs, "/", &files()).await?;
        assert_eq!(stat.mimetype, ARCHIVE_MIMETYPE);
        assert_eq!(fs.compress_calls.load(Ordering::SeqCst), 1);
        Ok(())
    }

    #[tokio::test]
    async fn compress_without_headroom_is_a_conflict_and_never_compresses() -> Result<()> {
        let (workflow, metrics) = workflow()?;
        let fs = FakeFilesystem::new().without_space();
        let err = workflow.compress(&fs, "/", &files()).await;
        assert!(matches!(
            err,
            Err(FileOpsError::Conflict {
                operation: "compress",
                ..
            })
        ));
        assert_eq!(fs.compress_calls.load(Ordering::SeqCst), 0);
        assert_eq!(metrics.snapshot().archive_conflicts, 1);
        Ok(())
    }

    #[tokio::test]
    async fn compress_rejects_empty_file_list() -> Result<()> {
        let (workflow, _) = workflow()?;
        let fs = FakeFilesystem::new();
        let err = workflow.compress(&fs, "/", &[]).await;
        assert!(matches!(err, Err(FileOpsError::InvalidInput { .. })));
        assert_eq!(fs.calls(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn compress_failures_are_generic() -> Result<()> {
        let (workflow, _) = workflow()?;
        let fs = FakeFilesystem::new().script("/", Script::Missing);
        let err = workflow.compress(&fs, "/", &files()).await;
        assert!(matches!(err, Err(FileOpsError::Failure { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn decompress_without_headroom_is_a_conflict() -> Result<()> {
        let (workflow, _) = workflow()?;
        let fs = FakeFilesystem::new().decompression_fits(Some(false));
        let err = workflow.decompress(&fs, "/", "backup.tar.gz").await;
        assert!(matches!(err, Err(FileOpsError::Conflict { .. })));
        assert_eq!(fs.decompress_calls.load(Ordering::SeqCst), 0);
        Ok(())
    }

    #[tokio::test]
    async fn decompress_of_missing_archive_is_not_found() -> Result<()> {
        let (workflow, _) = workflow()?;
        let fs = FakeFilesystem::new().decompression_fits(None);
        let err = workflow.decompress(&fs, "/", "missing.tar.gz").await;
        assert!(matches!(
            err,
            Err(FileOpsError::NotFound {
                operation: "decompress",
                ..
            })
        ));
        assert_eq!(fs.decompress_calls.load(Ordering::SeqCst), 0);
        Ok(())
    }

    #[tokio::test]
    async fn decompress_extraction_errors_are_classified() -> Result<()> {
        let (workflow, _) = workflow()?;
        let missing = FakeFilesystem::new().script("gone.zip", Script::Missing);
        assert!(matches!(
            workflow.decompress(&missing, "/", "gone.zip").await,
            Err(FileOpsError::NotFound { .. })
        ));

        let broken = FakeFilesystem::new().script("bad.zip", Script::Broken);
        assert!(matches!(
            workflow.decompress(&broken, "/", "bad.zip").await,
            Err(FileOpsError::Failure { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn decompress_applies_when_archive_fits() -> Result<()> {
        let (workflow, _) = workflow()?;
        let fs = FakeFilesystem::new();
        workflow.decompress(&fs, "/", "backup.tar.gz").await?;
        assert_eq!(fs.decompress_calls.load(Ordering::SeqCst), 1);
        Ok(())
    }
}
