//! Scriptable in-memory filesystem for workflow tests.

use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use hangar_fs::{FileStat, Filesystem, FsError, FsResult};

#[derive(Clone, Copy, Debug)]
pub(crate) enum Script {
    Missing,
    Collision,
    Broken,
}

impl Script {
    fn error(self, path: &str) -> FsError {
        match self {
            Self::Missing => FsError::NotFound {
                path: PathBuf::from(path),
            },
            Self::Collision => FsError::AlreadyExists {
                path: PathBuf::from(path),
            },
            Self::Broken => FsError::Io {
                operation: "fake",
                path: PathBuf::from(path),
                source: io::Error::other("scripted failure"),
            },
        }
    }
}

#[derive(Default)]
pub(crate) struct FakeFilesystem {
    pub(crate) calls: AtomicUsize,
    pub(crate) compress_calls: AtomicUsize,
    pub(crate) decompress_calls: AtomicUsize,
    scripts: HashMap<String, Script>,
    fail_first_call: AtomicBool,
    no_space: bool,
    decompression_fits: Option<bool>,
    seen: Mutex<Vec<String>>,
}

impl FakeFilesystem {
    pub(crate) fn new() -> Self {
        Self {
            decompression_fits: Some(true),
            ..Self::default()
        }
    }

    pub(crate) fn script(mut self, path: &str, script: Script) -> Self {
        self.scripts.insert(path.to_string(), script);
        self
    }

    pub(crate) fn failing_first_call(self) -> Self {
        self.fail_first_call.store(true, Ordering::SeqCst);
        self
    }

    pub(crate) fn without_space(mut self) -> Self {
        self.no_space = true;
        self
    }

    /// `None` makes the archive-aware check report a missing archive.
    pub(crate) fn decompression_fits(mut self, fits: Option<bool>) -> Self {
        self.decompression_fits = fits;
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn seen(&self) -> Vec<String> {
        self.seen
            .lock()
            .map(|seen| seen.clone())
            .unwrap_or_default()
    }

    fn record(&self, path: &str) -> FsResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(path.to_string());
        }
        if self.fail_first_call.swap(false, Ordering::SeqCst) {
            return Err(Script::Broken.error(path));
        }
        match self.scripts.get(path) {
            Some(script) => Err(script.error(path)),
            None => Ok(()),
        }
    }
}

fn stat(name: &str) -> FileStat {
    FileStat {
        name: name.to_string(),
        created: chrono::DateTime::<chrono::Utc>::UNIX_EPOCH,
        modified: chrono::DateTime::<chrono::Utc>::UNIX_EPOCH,
        mode: "-rw-r--r--".to_string(),
        mode_bits: "644".to_string(),
        size: 0,
        directory: false,
        file: true,
        symlink: false,
        mimetype: "application/octet-stream".to_string(),
    }
}

#[async_trait]
impl Filesystem for FakeFilesystem {
    async fn stat(&self, path: &str) -> FsResult<FileStat> {
        self.record(path)?;
        Ok(stat(path))
    }

    async fn list(&self, directory: &str) -> FsResult<Vec<FileStat>> {
        self.record(directory)?;
        Ok(Vec::new())
    }

    async fn open(&self, path: &str) -> FsResult<(FileStat, tokio::fs::File)> {
        self.record(path)?;
        Err(Script::Broken.error(path))
    }

    async fn rename(&self, from: &str, _to: &str) -> FsResult<()> {
        self.record(from)
    }

    async fn delete(&self, path: &str) -> FsResult<()> {
        self.record(path)
    }

    async fn copy(&self, location: &str) -> FsResult<()> {
        self.record(location)
    }

    async fn write(&self, path: &str, _contents: &[u8]) -> FsResult<()> {
        self.record(path)
    }

    async fn create_directory(&self, name: &str, _parent: &str) -> FsResult<()> {
        self.record(name)
    }

    async fn has_space_available(&self) -> bool {
        !self.no_space
    }

    async fn space_available_for_decompression(
        &self,
        _root: &str,
        archive: &str,
    ) -> FsResult<bool> {
        self.decompression_fits
            .ok_or_else(|| Script::Missing.error(archive))
    }

    async fn compress(&self, root: &str, _files: &[String]) -> FsResult<FileStat> {
        self.compress_calls.fetch_add(1, Ordering::SeqCst);
        self.record(root)?;
        Ok(stat("archive.tar.gz"))
    }

    async fn decompress(&self, _root: &str, archive: &str) -> FsResult<()> {
        self.decompress_calls.fetch_add(1, Ordering::SeqCst);
        self.record(archive)
    }
}
