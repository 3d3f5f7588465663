//! Disk-backed [`Filesystem`] rooted at a server directory.
//!
//! # Design
//! - All blocking IO runs on the tokio blocking pool; async callers never stall a worker.
//! - Every request path goes through [`Sandbox::resolve`] before it touches disk.
//! - Mutating calls invalidate the cached disk usage so the next space check is fresh.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info, warn};

use crate::archive;
use crate::error::{FsError, FsResult};
use crate::mime;
use crate::model::{ARCHIVE_MIMETYPE, FileStat};
use crate::sandbox::{Sandbox, join_path};
use crate::usage::{DiskUsage, host_available};
use crate::Filesystem;

/// Tunables for a [`LocalFilesystem`].
#[derive(Debug, Clone)]
pub struct LocalFilesystemOptions {
    /// Disk quota in bytes; `0` means unlimited (bounded by host free space).
    pub disk_limit_bytes: u64,
    /// How long a computed disk usage figure stays valid.
    pub usage_ttl: Duration,
    /// Highest numbered `copy N` suffix tried before a copy gives up.
    pub copy_suffix_limit: u32,
}

impl Default for LocalFilesystemOptions {
    fn default() -> Self {
        Self {
            disk_limit_bytes: 0,
            usage_ttl: Duration::from_secs(60),
            copy_suffix_limit: 50,
        }
    }
}

/// Filesystem capability backed by a local directory.
#[derive(Clone)]
pub struct LocalFilesystem {
    inner: Arc<Inner>,
}

struct Inner {
    sandbox: Sandbox,
    usage: DiskUsage,
    options: LocalFilesystemOptions,
}

impl LocalFilesystem {
    /// Open (creating if necessary) a server root.
    ///
    /// # Errors
    ///
    /// Returns an error if the root cannot be created or canonicalised.
    pub fn new(root: impl Into<PathBuf>, options: LocalFilesystemOptions) -> FsResult<Self> {
        let sandbox = Sandbox::new(root)?;
        let usage = DiskUsage::new(sandbox.root().to_path_buf(), options.usage_ttl);
        Ok(Self {
            inner: Arc::new(Inner {
                sandbox,
                usage,
                options,
            }),
        })
    }

    /// Canonical server root.
    #[must_use]
    pub fn root(&self) -> &Path {
        self.inner.sandbox.root()
    }

    /// Resolve a request path inside the server root.
    ///
    /// # Errors
    ///
    /// Returns [`FsError::OutsideSandbox`] for paths escaping the root.
    pub fn resolve(&self, path: &str) -> FsResult<PathBuf> {
        self.inner.sandbox.resolve(path)
    }

    /// Bytes currently used under the root.
    ///
    /// # Errors
    ///
    /// Returns an error if the tree cannot be walked.
    pub async fn disk_usage(&self) -> FsResult<u64> {
        self.blocking("usage", |inner| inner.usage.current()).await
    }

    async fn blocking<T, F>(&self, operation: &'static str, task: F) -> FsResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Inner) -> FsResult<T> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || task(&inner))
            .await
            .map_err(|source| FsError::Join { operation, source })?
    }
}

impl Inner {
    fn stat_path(path: &Path) -> FsResult<FileStat> {
        let link = fs::symlink_metadata(path).map_err(|err| FsError::io("stat", path, err))?;
        let symlink = link.file_type().is_symlink();
        let metadata = if symlink {
            fs::metadata(path).unwrap_or(link)
        } else {
            link
        };
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mimetype = mime::detect(path, metadata.is_dir());
        Ok(FileStat::from_metadata(name, &metadata, symlink, mimetype))
    }

    fn list(&self, directory: &str) -> FsResult<Vec<FileStat>> {
        let path = self.sandbox.resolve(directory)?;
        let metadata = fs::metadata(&path).map_err(|err| FsError::io("list", &path, err))?;
        if !metadata.is_dir() {
            return Err(FsError::NotADirectory { path });
        }

        let reader = fs::read_dir(&path).map_err(|err| FsError::io("list", &path, err))?;
        let mut entries = Vec::new();
        for entry in reader {
            let entry = entry.map_err(|err| FsError::io("list.entry", &path, err))?;
            match Self::stat_path(&entry.path()) {
                Ok(stat) => entries.push(stat),
                // Removed between readdir and stat.
                Err(FsError::NotFound { .. }) => {}
                Err(err) => return Err(err),
            }
        }
        entries.sort_by(|a, b| {
            b.directory
                .cmp(&a.directory)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(entries)
    }

    fn rename(&self, from: &str, to: &str) -> FsResult<()> {
        let source = self.sandbox.resolve(from)?;
        let destination = self.sandbox.resolve(to)?;
        fs::symlink_metadata(&source).map_err(|err| FsError::io("rename.source", &source, err))?;
        if fs::symlink_metadata(&destination).is_ok() {
            return Err(FsError::AlreadyExists { path: destination });
        }
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)
                .map_err(|err| FsError::io("rename.create_parent", parent, err))?;
        }
        fs::rename(&source, &destination).map_err(|err| FsError::io("rename", &source, err))?;
        debug!(from = %source.display(), to = %destination.display(), "renamed path");
        Ok(())
    }

    fn delete(&self, path: &str) -> FsResult<()> {
        let target = self.sandbox.resolve(path)?;
        if self.sandbox.is_root(&target) {
            return Err(FsError::RootDeletion);
        }
        let metadata =
            fs::symlink_metadata(&target).map_err(|err| FsError::io("delete", &target, err))?;
        if metadata.is_dir() {
            fs::remove_dir_all(&target).map_err(|err| FsError::io("delete.dir", &target, err))?;
        } else {
            fs::remove_file(&target).map_err(|err| FsError::io("delete.file", &target, err))?;
        }
        self.usage.invalidate();
        debug!(path = %target.display(), "deleted path");
        Ok(())
    }

    fn copy(&self, location: &str) -> FsResult<()> {
        let source = self.sandbox.resolve(location)?;
        let metadata = fs::metadata(&source).map_err(|err| FsError::io("copy", &source, err))?;
        if metadata.is_dir() {
            return Err(FsError::IsADirectory { path: source });
        }
        let destination = self.copy_destination(&source)?;
        fs::copy(&source, &destination).map_err(|err| FsError::io("copy", &source, err))?;
        self.usage.invalidate();
        debug!(from = %source.display(), to = %destination.display(), "copied file");
        Ok(())
    }

    fn copy_destination(&self, source: &Path) -> FsResult<PathBuf> {
        let parent = source.parent().unwrap_or_else(|| self.sandbox.root());
        let stem = source
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        let extension = source
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();

        for attempt in 0..=self.options.copy_suffix_limit {
            let suffix = if attempt == 0 {
                " copy".to_string()
            } else {
                format!(" copy {attempt}")
            };
            let candidate = parent.join(format!("{stem}{suffix}{extension}"));
            if fs::symlink_metadata(&candidate).is_err() {
                return Ok(candidate);
            }
        }
        Err(FsError::CopyNamesExhausted {
            path: source.to_path_buf(),
        })
    }

    fn write(&self, path: &str, contents: &[u8]) -> FsResult<()> {
        let target = self.sandbox.resolve(path)?;
        if fs::metadata(&target).is_ok_and(|metadata| metadata.is_dir()) {
            return Err(FsError::IsADirectory { path: target });
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .map_err(|err| FsError::io("write.create_parent", parent, err))?;
        }
        fs::write(&target, contents).map_err(|err| FsError::io("write", &target, err))?;
        self.usage.invalidate();
        debug!(path = %target.display(), bytes = contents.len(), "wrote file");
        Ok(())
    }

    fn create_directory(&self, name: &str, parent: &str) -> FsResult<()> {
        let target = self.sandbox.resolve(&join_path(parent, name))?;
        fs::create_dir_all(&target).map_err(|err| FsError::io("mkdir", &target, err))
    }

    fn has_space_available(&self) -> FsResult<bool> {
        if self.options.disk_limit_bytes == 0 {
            return Ok(host_available(self.sandbox.root()).is_none_or(|free| free > 0));
        }
        Ok(self.usage.current()? < self.options.disk_limit_bytes)
    }

    fn space_available_for_decompression(&self, root: &str, file: &str) -> FsResult<bool> {
        let archive_path = self.sandbox.resolve(&join_path(root, file))?;
        fs::metadata(&archive_path)
            .map_err(|err| FsError::io("decompress.stat", &archive_path, err))?;
        let needed = archive::uncompressed_size(&archive_path)?;

        if self.options.disk_limit_bytes == 0 {
            return Ok(host_available(self.sandbox.root()).is_none_or(|free| needed <= free));
        }
        let used = self.usage.current()?;
        Ok(used.saturating_add(needed) <= self.options.disk_limit_bytes)
    }

    fn compress(&self, root: &str, files: &[String]) -> FsResult<FileStat> {
        let base = self.sandbox.resolve(root)?;
        let metadata = fs::metadata(&base).map_err(|err| FsError::io("compress.root", &base, err))?;
        if !metadata.is_dir() {
            return Err(FsError::NotADirectory { path: base });
        }
        let sources = files
            .iter()
            .map(|file| self.sandbox.resolve(&join_path(root, file)))
            .collect::<FsResult<Vec<_>>>()?;

        let destination = Self::archive_destination(&base);
        if let Err(err) = archive::create_tar_gz(&base, &sources, &destination) {
            if let Err(cleanup) = fs::remove_file(&destination)
                && cleanup.kind() != std::io::ErrorKind::NotFound
            {
                warn!(
                    archive = %destination.display(),
                    error = %cleanup,
                    "failed to remove partial archive"
                );
            }
            return Err(err);
        }
        self.usage.invalidate();
        info!(
            archive = %destination.display(),
            entries = sources.len(),
            "created archive"
        );
        Ok(Self::stat_path(&destination)?.with_mimetype(ARCHIVE_MIMETYPE))
    }

    fn archive_destination(base: &Path) -> PathBuf {
        let stamp = Utc::now().format("%Y-%m-%dT%H%M%SZ");
        let mut candidate = base.join(format!("archive-{stamp}.tar.gz"));
        let mut counter = 1_u32;
        while candidate.exists() {
            candidate = base.join(format!("archive-{stamp}-{counter}.tar.gz"));
            counter += 1;
        }
        candidate
    }

    fn decompress(&self, root: &str, file: &str) -> FsResult<()> {
        let target = self.sandbox.resolve(root)?;
        let archive_path = self.sandbox.resolve(&join_path(root, file))?;
        fs::metadata(&archive_path)
            .map_err(|err| FsError::io("decompress.stat", &archive_path, err))?;
        let result = archive::extract(&archive_path, &target);
        self.usage.invalidate();
        result?;
        info!(
            archive = %archive_path.display(),
            target = %target.display(),
            "extracted archive"
        );
        Ok(())
    }
}

#[async_trait]
impl Filesystem for LocalFilesystem {
    async fn stat(&self, path: &str) -> FsResult<FileStat> {
        let path = path.to_string();
        self.blocking("stat", move |inner| {
            Inner::stat_path(&inner.sandbox.resolve(&path)?)
        })
        .await
    }

    async fn list(&self, directory: &str) -> FsResult<Vec<FileStat>> {
        let directory = directory.to_string();
        self.blocking("list", move |inner| inner.list(&directory)).await
    }

    async fn open(&self, path: &str) -> FsResult<(FileStat, tokio::fs::File)> {
        let resolved = self.resolve(path)?;
        let stat_target = resolved.clone();
        let stat = self
            .blocking("open.stat", move |_| Inner::stat_path(&stat_target))
            .await?;
        if stat.directory {
            return Err(FsError::IsADirectory { path: resolved });
        }
        let file = tokio::fs::File::open(&resolved)
            .await
            .map_err(|err| FsError::io("open", &resolved, err))?;
        Ok((stat, file))
    }

    async fn rename(&self, from: &str, to: &str) -> FsResult<()> {
        let (from, to) = (from.to_string(), to.to_string());
        self.blocking("rename", move |inner| inner.rename(&from, &to)).await
    }

    async fn delete(&self, path: &str) -> FsResult<()> {
        let path = path.to_string();
        self.blocking("delete", move |inner| inner.delete(&path)).await
    }

    async fn copy(&self, location: &str) -> FsResult<()> {
        let location = location.to_string();
        self.blocking("copy", move |inner| inner.copy(&location)).await
    }

    async fn write(&self, path: &str, contents: &[u8]) -> FsResult<()> {
        let path = path.to_string();
        let contents = contents.to_vec();
        self.blocking("write", move |inner| inner.write(&path, &contents)).await
    }

    async fn create_directory(&self, name: &str, parent: &str) -> FsResult<()> {
        let (name, parent) = (name.to_string(), parent.to_string());
        self.blocking("mkdir", move |inner| inner.create_directory(&name, &parent)).await
    }

    async fn has_space_available(&self) -> bool {
        match self.blocking("space", Inner::has_space_available).await {
            Ok(available) => available,
            Err(err) => {
                warn!(error = %err, "disk usage lookup failed; assuming headroom");
                true
            }
        }
    }

    async fn space_available_for_decompression(
        &self,
        root: &str,
        archive: &str,
    ) -> FsResult<bool> {
        let (root, archive) = (root.to_string(), archive.to_string());
        self.blocking("decompress.space", move |inner| {
            inner.space_available_for_decompression(&root, &archive)
        })
        .await
    }

    async fn compress(&self, root: &str, files: &[String]) -> FsResult<FileStat> {
        let root = root.to_string();
        let files = files.to_vec();
        self.blocking("compress", move |inner| inner.compress(&root, &files)).await
    }

    async fn decompress(&self, root: &str, archive: &str) -> FsResult<()> {
        let (root, archive) = (root.to_string(), archive.to_string());
        self.blocking("decompress", move |inner| inner.decompress(&root, &archive)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    fn server(limit: u64) -> Result<(tempfile::TempDir, LocalFilesystem)> {
        let temp = tempfile::tempdir()?;
        let fs = LocalFilesystem::new(
            temp.path().join("server"),
            LocalFilesystemOptions {
                disk_limit_bytes: limit,
                usage_ttl: Duration::ZERO,
                copy_suffix_limit: 2,
            },
        )?;
        Ok((temp, fs))
    }

    #[tokio::test]
    async fn list_sorts_directories_first() -> Result<()> {
        let (_temp, fs) = server(0)?;
        fs.write("/b.txt", b"b").await?;
        fs.write("/a.txt", b"a").await?;
        fs.create_directory("zeta", "/").await?;

        let names: Vec<_> = fs.list("/").await?.into_iter().map(|s| s.name).collect();
        assert_eq!(names, ["zeta", "a.txt", "b.txt"]);

        let err = fs.list("/a.txt").await.err();
        assert!(matches!(err, Some(FsError::NotADirectory { .. })));
        let err = fs.list("/nope").await.err();
        assert!(matches!(err, Some(FsError::NotFound { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn rename_refuses_existing_destination() -> Result<()> {
        let (_temp, fs) = server(0)?;
        fs.write("/x", b"x").await?;
        fs.write("/z", b"z").await?;

        fs.rename("/x", "/nested/y").await?;
        assert_eq!(std::fs::read(fs.root().join("nested/y"))?, b"x");

        let err = fs.rename("/z", "/nested/y").await.err();
        assert!(matches!(err, Some(FsError::AlreadyExists { .. })));
        let err = fs.rename("/gone", "/elsewhere").await.err();
        assert!(matches!(err, Some(FsError::NotFound { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn delete_handles_trees_missing_paths_and_root() -> Result<()> {
        let (_temp, fs) = server(0)?;
        fs.write("/logs/latest.log", b"log").await?;
        fs.delete("/logs").await?;
        assert!(!fs.root().join("logs").exists());

        assert!(fs.delete("/logs").await.is_err_and(|err| err.is_not_found()));
        assert!(matches!(fs.delete("/").await, Err(FsError::RootDeletion)));
        Ok(())
    }

    #[tokio::test]
    async fn copy_picks_free_names_until_exhausted() -> Result<()> {
        let (_temp, fs) = server(0)?;
        fs.write("/server.properties", b"motd=hi").await?;

        fs.copy("/server.properties").await?;
        fs.copy("/server.properties").await?;
        assert!(fs.root().join("server copy.properties").exists());
        assert!(fs.root().join("server copy 1.properties").exists());

        fs.copy("/server.properties").await?;
        let err = fs.copy("/server.properties").await.err();
        assert!(matches!(err, Some(FsError::CopyNamesExhausted { .. })));

        let err = fs.copy("/absent.txt").await.err();
        assert!(matches!(err, Some(FsError::NotFound { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn open_rejects_directories() -> Result<()> {
        let (_temp, fs) = server(0)?;
        fs.write("/motd.txt", b"welcome").await?;
        let (stat, _file) = fs.open("/motd.txt").await?;
        assert_eq!(stat.size, 7);
        assert_eq!(stat.mimetype, "text/plain; charset=utf-8");

        let err = fs.open("/").await.err();
        assert!(matches!(err, Some(FsError::IsADirectory { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn quota_drives_space_checks() -> Result<()> {
        let (_temp, fs) = server(100)?;
        fs.write("/data/a.bin", &[0_u8; 40]).await?;
        assert!(fs.has_space_available().await);

        let archive = fs.compress("/", &["data".to_string()]).await?;
        assert_eq!(archive.mimetype, ARCHIVE_MIMETYPE);
        assert!(archive.name.starts_with("archive-"));

        let used = fs.disk_usage().await?;
        assert!(used > 40);
        // 40 bytes of data plus the archive itself; extracting adds another 40.
        let fits = fs
            .space_available_for_decompression("/", &archive.name)
            .await?;
        assert_eq!(fits, used + 40 <= 100);

        fs.write("/data/b.bin", &[0_u8; 100]).await?;
        assert!(!fs.has_space_available().await);
        let fits = fs
            .space_available_for_decompression("/", &archive.name)
            .await?;
        assert!(!fits);
        Ok(())
    }

    #[tokio::test]
    async fn decompress_restores_archived_tree() -> Result<()> {
        let (_temp, fs) = server(0)?;
        fs.write("/world/level.dat", b"level").await?;
        let archive = fs.compress("/", &["world".to_string()]).await?;
        fs.delete("/world").await?;

        fs.decompress("/", &archive.name).await?;
        assert_eq!(std::fs::read(fs.root().join("world/level.dat"))?, b"level");

        let err = fs.decompress("/", "missing.tar.gz").await.err();
        assert!(matches!(err, Some(FsError::NotFound { .. })));
        let err = fs
            .space_available_for_decompression("/", "missing.tar.gz")
            .await
            .err();
        assert!(matches!(err, Some(FsError::NotFound { .. })));
        Ok(())
    }

    fn archive_entries(path: &Path) -> Result<Vec<String>> {
        let file = std::fs::File::open(path)?;
        let mut archive = tar::Archive::new(flate2::read::GzDecoder::new(file));
        let mut names = Vec::new();
        for entry in archive.entries()? {
            names.push(entry?.path()?.to_string_lossy().into_owned());
        }
        Ok(names)
    }

    #[tokio::test]
    async fn compressing_the_root_archives_its_files_but_not_itself() -> Result<()> {
        let (_temp, fs) = server(0)?;
        fs.write("/a.txt", &vec![b'a'; 2 * 1024 * 1024]).await?;
        fs.write("/world/level.dat", b"level").await?;

        for root_alias in ["/", "."] {
            let archive = fs.compress("/", &[root_alias.to_string()]).await?;
            let names = archive_entries(&fs.root().join(&archive.name))?;
            assert!(names.iter().any(|name| name == "a.txt"), "{names:?}");
            assert!(names.iter().any(|name| name == "world/level.dat"), "{names:?}");
            assert!(!names.iter().any(|name| name == &archive.name), "{names:?}");
            fs.delete(&archive.name).await?;
        }
        Ok(())
    }

    #[tokio::test]
    async fn failed_compress_leaves_no_partial_archive() -> Result<()> {
        let (_temp, fs) = server(0)?;
        fs.write("/present.txt", b"here").await?;

        let err = fs
            .compress("/", &["present.txt".to_string(), "absent.txt".to_string()])
            .await
            .err();
        assert!(matches!(err, Some(FsError::NotFound { .. })));
        let names: Vec<_> = fs.list("/").await?.into_iter().map(|s| s.name).collect();
        assert_eq!(names, ["present.txt"]);
        Ok(())
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn writes_never_follow_dangling_links_out_of_the_root() -> Result<()> {
        let (temp, fs) = server(0)?;
        let outside = temp.path().join("outside.txt");
        std::os::unix::fs::symlink(&outside, fs.root().join("dangling"))?;

        let err = fs.write("/dangling", b"pwned").await.err();
        assert!(matches!(err, Some(FsError::OutsideSandbox { .. })));
        let err = fs.create_directory("nested", "/dangling").await.err();
        assert!(matches!(err, Some(FsError::OutsideSandbox { .. })));
        assert!(!outside.exists());
        Ok(())
    }
}
