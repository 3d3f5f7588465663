#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions)]

//! Sandboxed filesystem capability for a single server workspace.
//!
//! Layout: `sandbox.rs` (path confinement), `local.rs` (disk-backed implementation),
//! `archive.rs` (tar/zip codecs), `usage.rs` (space accounting), `mime.rs`, `model.rs`.

mod archive;
pub mod error;
pub mod local;
pub mod mime;
pub mod model;
pub mod sandbox;
mod usage;

use async_trait::async_trait;
use tokio::fs::File;

pub use error::{FsError, FsResult};
pub use local::{LocalFilesystem, LocalFilesystemOptions};
pub use model::{ARCHIVE_MIMETYPE, FileStat};
pub use sandbox::{Sandbox, join_path};

/// Path-checked operations against one server's files.
///
/// Every path argument is relative to the server root; implementations must confine it.
/// Implementations are shared across concurrent requests and must tolerate parallel calls
/// against distinct paths.
#[async_trait]
pub trait Filesystem: Send + Sync {
    /// Stat a single path.
    async fn stat(&self, path: &str) -> FsResult<FileStat>;

    /// List a directory, directories first then by name.
    async fn list(&self, directory: &str) -> FsResult<Vec<FileStat>>;

    /// Open a regular file for streaming.
    async fn open(&self, path: &str) -> FsResult<(FileStat, File)>;

    /// Move `from` to `to`.
    async fn rename(&self, from: &str, to: &str) -> FsResult<()>;

    /// Remove a file or directory tree.
    async fn delete(&self, path: &str) -> FsResult<()>;

    /// Duplicate a file beside itself under a free name.
    async fn copy(&self, location: &str) -> FsResult<()>;

    /// Create or replace a file with `contents`.
    async fn write(&self, path: &str, contents: &[u8]) -> FsResult<()>;

    /// Create `name` (and any missing parents) under `parent`.
    async fn create_directory(&self, name: &str, parent: &str) -> FsResult<()>;

    /// Whether the server has any headroom left at all.
    async fn has_space_available(&self) -> bool;

    /// Whether extracting `archive` under `root` would fit in the remaining headroom.
    async fn space_available_for_decompression(&self, root: &str, archive: &str)
    -> FsResult<bool>;

    /// Pack `files` (relative to `root`) into a new archive inside `root`.
    async fn compress(&self, root: &str, files: &[String]) -> FsResult<FileStat>;

    /// Extract `archive` (relative to `root`) into `root`.
    async fn decompress(&self, root: &str, archive: &str) -> FsResult<()>;
}
