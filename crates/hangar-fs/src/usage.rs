//! Disk usage accounting for a server root.
//!
//! Usage is the apparent size of every regular file under the root. Walking large trees is
//! expensive, so the figure is cached for a configurable window and dropped whenever this
//! process mutates the tree.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use systemstat::{Platform, System};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{FsError, FsResult};

#[derive(Debug)]
pub(crate) struct DiskUsage {
    root: PathBuf,
    ttl: Duration,
    cached: Mutex<Option<(Instant, u64)>>,
}

impl DiskUsage {
    pub(crate) const fn new(root: PathBuf, ttl: Duration) -> Self {
        Self {
            root,
            ttl,
            cached: Mutex::new(None),
        }
    }

    /// Current usage in bytes, recomputed when the cached figure is stale.
    pub(crate) fn current(&self) -> FsResult<u64> {
        if let Some((taken, bytes)) = *self.lock()
            && taken.elapsed() < self.ttl
        {
            return Ok(bytes);
        }
        let bytes = directory_size(&self.root)?;
        debug!(root = %self.root.display(), bytes, "recomputed disk usage");
        *self.lock() = Some((Instant::now(), bytes));
        Ok(bytes)
    }

    pub(crate) fn invalidate(&self) {
        *self.lock() = None;
    }

    fn lock(&self) -> MutexGuard<'_, Option<(Instant, u64)>> {
        self.cached
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

pub(crate) fn directory_size(root: &Path) -> FsResult<u64> {
    let mut total = 0_u64;
    for entry in WalkDir::new(root) {
        let entry = entry.map_err(|err| FsError::walkdir("usage.walk", root, err))?;
        if entry.file_type().is_file() {
            let metadata = entry
                .metadata()
                .map_err(|err| FsError::walkdir("usage.metadata", entry.path(), err))?;
            total = total.saturating_add(metadata.len());
        }
    }
    Ok(total)
}

/// Free bytes on the host mount holding `path`, when the platform reports it.
pub(crate) fn host_available(path: &Path) -> Option<u64> {
    let system = System::new();
    let mounts = match system.mounts() {
        Ok(mounts) => mounts,
        Err(err) => {
            warn!(error = %err, "failed to enumerate mounts for free space lookup");
            return None;
        }
    };
    mounts
        .into_iter()
        .filter(|mount| path.starts_with(&mount.fs_mounted_on))
        .max_by_key(|mount| mount.fs_mounted_on.len())
        .map(|mount| mount.avail.as_u64())
}
