//! Path confinement for a single server root.
//!
//! # Design
//! - Requests address files with `/`-separated paths relative to the server root.
//! - Lexical normalisation rejects `..` climbing above the root before touching disk.
//! - The longest existing prefix is canonicalised so symlinks cannot point outside the root.
//! - Dangling links are followed to their target, which must also land inside the root.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{FsError, FsResult};

/// Join a request root and a relative path the way URL paths are joined.
///
/// The result is lexically cleaned; it is not confined, that happens in [`Sandbox::resolve`].
#[must_use]
pub fn join_path(root: &str, path: &str) -> String {
    let rooted = root.starts_with('/') || (root.is_empty() && path.starts_with('/'));
    let mut parts: Vec<&str> = Vec::new();
    for segment in root.split('/').chain(path.split('/')) {
        match segment {
            "" | "." => {}
            ".." => {
                if parts.last().is_some_and(|last| *last != "..") {
                    parts.pop();
                } else if !rooted {
                    parts.push("..");
                }
            }
            other => parts.push(other),
        }
    }
    let joined = parts.join("/");
    if rooted {
        format!("/{joined}")
    } else if joined.is_empty() {
        ".".to_string()
    } else {
        joined
    }
}

/// Canonical server root that every resolved path must stay under.
#[derive(Debug, Clone)]
pub struct Sandbox {
    root: PathBuf,
}

impl Sandbox {
    /// Create the root directory if needed and pin its canonical form.
    ///
    /// # Errors
    ///
    /// Returns [`FsError::Io`] when the directory cannot be created or canonicalised.
    pub fn new(root: impl Into<PathBuf>) -> FsResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|err| FsError::io("sandbox.create_root", &root, err))?;
        let root = fs::canonicalize(&root)
            .map_err(|err| FsError::io("sandbox.canonicalize_root", &root, err))?;
        Ok(Self { root })
    }

    /// Canonical root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a request path to an absolute path inside the root.
    ///
    /// The target itself does not need to exist.
    ///
    /// # Errors
    ///
    /// Returns [`FsError::OutsideSandbox`] when the path escapes the root lexically or via a
    /// symlink, and [`FsError::Io`] when an existing ancestor cannot be inspected.
    pub fn resolve(&self, raw: &str) -> FsResult<PathBuf> {
        let relative = normalise(raw).ok_or_else(|| outside(raw))?;
        let mut pending = self.root.join(relative);
        for _ in 0..MAX_LINK_HOPS {
            match self.resolve_existing_prefix(&pending, raw)? {
                Step::Resolved(resolved) => return Ok(resolved),
                Step::Dangling(next) => pending = next,
            }
        }
        Err(outside(raw))
    }

    /// Canonicalise the longest existing prefix of `joined`, or stop at a dangling link and
    /// hand back the path it points to.
    fn resolve_existing_prefix(&self, joined: &Path, raw: &str) -> FsResult<Step> {
        let mut existing = joined;
        let mut tail: Vec<OsString> = Vec::new();
        loop {
            match fs::canonicalize(existing) {
                Ok(canonical) => {
                    if !canonical.starts_with(&self.root) {
                        return Err(outside(raw));
                    }
                    let mut resolved = canonical;
                    resolved.extend(tail.iter().rev());
                    return Ok(Step::Resolved(resolved));
                }
                Err(err) if err.kind() == io::ErrorKind::NotFound => {
                    let (Some(name), Some(parent)) = (existing.file_name(), existing.parent())
                    else {
                        return Err(outside(raw));
                    };
                    if let Ok(link) = fs::read_link(existing) {
                        let mut next = parent.join(link);
                        next.extend(tail.iter().rev());
                        return Ok(Step::Dangling(next));
                    }
                    tail.push(name.to_os_string());
                    existing = parent;
                }
                Err(err) => return Err(FsError::io("sandbox.resolve", existing, err)),
            }
        }
    }

    /// Whether `path` is the root itself.
    #[must_use]
    pub fn is_root(&self, path: &Path) -> bool {
        path == self.root
    }
}

const MAX_LINK_HOPS: usize = 40;

enum Step {
    Resolved(PathBuf),
    Dangling(PathBuf),
}

fn outside(raw: &str) -> FsError {
    FsError::OutsideSandbox {
        path: raw.to_string(),
    }
}

fn normalise(raw: &str) -> Option<PathBuf> {
    let mut parts: Vec<&str> = Vec::new();
    for segment in raw.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            other => parts.push(other),
        }
    }
    Some(parts.iter().collect())
}
