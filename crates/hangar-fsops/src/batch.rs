//! Concurrent rename/delete batches.
//!
//! # Design
//! - One task per item; items share a cancellation flag and have no ordering between them.
//! - A unit checks the flag before it starts; units already inside a filesystem call finish.
//! - A missing target counts as success so retried or overlapping batches stay quiet.
//! - The first hard failure cancels the rest and becomes the batch result; later ones are
//!   logged and dropped. Completed items are never rolled back.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use hangar_fs::{Filesystem, FsError, join_path};
use hangar_telemetry::Metrics;
use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::error::{FileOpsError, FileOpsResult};

/// One move within a rename batch, both paths relative to the batch root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameItem {
    /// Current location.
    pub from: String,
    /// New location.
    pub to: String,
}

/// Same-kind file actions submitted as one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchAction {
    /// Move every `from` to its `to`.
    Rename(Vec<RenameItem>),
    /// Remove every listed path.
    Delete(Vec<String>),
}

impl BatchAction {
    /// Action label used in logs and metrics.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Rename(_) => "rename",
            Self::Delete(_) => "delete",
        }
    }

    /// Number of items in the batch.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Rename(items) => items.len(),
            Self::Delete(paths) => paths.len(),
        }
    }

    /// Whether the batch has no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn into_units(self, root: &str) -> Vec<Unit> {
        match self {
            Self::Rename(items) => items
                .into_iter()
                .map(|item| Unit::Rename {
                    from: join_path(root, &item.from),
                    to: join_path(root, &item.to),
                })
                .collect(),
            Self::Delete(paths) => paths
                .into_iter()
                .map(|path| Unit::Delete {
                    path: join_path(root, &path),
                })
                .collect(),
        }
    }
}

enum Unit {
    Rename { from: String, to: String },
    Delete { path: String },
}

impl Unit {
    async fn apply(&self, fs: &dyn Filesystem) -> Result<(), FsError> {
        match self {
            Self::Rename { from, to } => fs.rename(from, to).await,
            Self::Delete { path } => fs.delete(path).await,
        }
    }

    fn target(&self) -> &str {
        match self {
            Self::Rename { from, .. } => from,
            Self::Delete { path } => path,
        }
    }
}

#[derive(Debug)]
enum ItemOutcome {
    Applied,
    AlreadyGone,
    Skipped,
    Failed(FsError),
}

impl ItemOutcome {
    const fn label(&self) -> &'static str {
        match self {
            Self::Applied => "success",
            Self::AlreadyGone => "not_found",
            Self::Skipped => "skipped",
            Self::Failed(_) => "failure",
        }
    }
}

/// Runs rename/delete batches against a server filesystem.
#[derive(Clone)]
pub struct BatchExecutor {
    metrics: Metrics,
}

impl BatchExecutor {
    /// Build an executor that records per-item outcomes in `metrics`.
    #[must_use]
    pub const fn new(metrics: Metrics) -> Self {
        Self { metrics }
    }

    /// Rename every item under `root`.
    ///
    /// # Errors
    ///
    /// See [`BatchExecutor::execute`].
    pub async fn rename(
        &self,
        fs: Arc<dyn Filesystem>,
        root: &str,
        items: Vec<RenameItem>,
    ) -> FileOpsResult<()> {
        self.execute(fs, root, BatchAction::Rename(items)).await
    }

    /// Delete every path under `root`.
    ///
    /// # Errors
    ///
    /// See [`BatchExecutor::execute`].
    pub async fn delete(
        &self,
        fs: Arc<dyn Filesystem>,
        root: &str,
        paths: Vec<String>,
    ) -> FileOpsResult<()> {
        self.execute(fs, root, BatchAction::Delete(paths)).await
    }

    /// Apply `action` to every item concurrently and reduce the results.
    ///
    /// # Errors
    ///
    /// Returns [`FileOpsError::InvalidInput`] for an empty batch (no filesystem calls are
    /// made), or [`FileOpsError::Failure`] carrying the first hard failure observed.
    pub async fn execute(
        &self,
        fs: Arc<dyn Filesystem>,
        root: &str,
        action: BatchAction,
    ) -> FileOpsResult<()> {
        if action.is_empty() {
            return Err(FileOpsError::empty("files"));
        }
        let operation = action.name();
        let total = action.len();
        let cancelled = Arc::new(AtomicBool::new(false));

        let mut units = JoinSet::new();
        for unit in action.into_units(root) {
            let fs = Arc::clone(&fs);
            let cancelled = Arc::clone(&cancelled);
            units.spawn(async move { run_unit(fs.as_ref(), &cancelled, &unit).await });
        }

        let mut first_failure = None;
        let mut skipped = 0_usize;
        while let Some(joined) = units.join_next().await {
            let outcome = joined.unwrap_or_else(|source| {
                cancelled.store(true, Ordering::Release);
                ItemOutcome::Failed(FsError::Join {
                    operation: "batch.unit",
                    source,
                })
            });
            self.metrics.inc_batch_item(operation, outcome.label());
            match outcome {
                ItemOutcome::Failed(err) if first_failure.is_none() => first_failure = Some(err),
                ItemOutcome::Failed(err) => {
                    debug!(action = operation, error = %err, "discarding additional batch failure");
                }
                ItemOutcome::Skipped => skipped += 1,
                ItemOutcome::Applied | ItemOutcome::AlreadyGone => {}
            }
        }

        match first_failure {
            Some(source) => {
                warn!(
                    action = operation,
                    root,
                    items = total,
                    skipped,
                    error = %source,
                    "batch aborted"
                );
                Err(FileOpsError::Failure { operation, source })
            }
            None => {
                info!(action = operation, root, items = total, "batch applied");
                Ok(())
            }
        }
    }
}

async fn run_unit(fs: &dyn Filesystem, cancelled: &AtomicBool, unit: &Unit) -> ItemOutcome {
    if cancelled.load(Ordering::Acquire) {
        return ItemOutcome::Skipped;
    }
    match unit.apply(fs).await {
        Ok(()) => ItemOutcome::Applied,
        Err(err) if err.is_not_found() => {
            debug!(target_path = unit.target(), "batch target already absent");
            ItemOutcome::AlreadyGone
        }
        Err(err) => {
            cancelled.store(true, Ordering::Release);
            ItemOutcome::Failed(err)
        }
    }
}
