//! File metadata as exposed to API consumers.

use std::fs::Metadata;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

/// MIME type reported for archives produced by the compress operation.
pub const ARCHIVE_MIMETYPE: &str = "application/tar+gzip";

/// Stat information for a single file or directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileStat {
    /// Final path component.
    pub name: String,
    /// Creation time, falling back to modification time where unsupported.
    pub created: DateTime<Utc>,
    /// Last modification time.
    pub modified: DateTime<Utc>,
    /// Symbolic permission string (e.g. `-rw-r--r--`).
    pub mode: String,
    /// Octal permission bits (e.g. `644`).
    pub mode_bits: String,
    /// Size in bytes.
    pub size: u64,
    /// Whether the entry is a directory.
    pub directory: bool,
    /// Whether the entry is a regular file.
    pub file: bool,
    /// Whether the entry itself is a symbolic link.
    pub symlink: bool,
    /// Detected MIME type.
    pub mimetype: String,
}

impl FileStat {
    /// Build a stat record from filesystem metadata.
    #[must_use]
    pub fn from_metadata(
        name: impl Into<String>,
        metadata: &Metadata,
        symlink: bool,
        mimetype: impl Into<String>,
    ) -> Self {
        let modified = metadata.modified().map_or_else(|_| Utc::now(), to_utc);
        let created = metadata.created().map_or(modified, to_utc);
        let bits = permission_bits(metadata);
        Self {
            name: name.into(),
            created,
            modified,
            mode: symbolic_mode(bits, metadata.is_dir(), symlink),
            mode_bits: format!("{bits:o}"),
            size: metadata.len(),
            directory: metadata.is_dir(),
            file: metadata.is_file(),
            symlink,
            mimetype: mimetype.into(),
        }
    }

    /// Replace the reported MIME type.
    #[must_use]
    pub fn with_mimetype(mut self, mimetype: impl Into<String>) -> Self {
        self.mimetype = mimetype.into();
        self
    }
}

fn to_utc(time: SystemTime) -> DateTime<Utc> {
    DateTime::<Utc>::from(time)
}

#[cfg(unix)]
fn permission_bits(metadata: &Metadata) -> u32 {
    metadata.permissions().mode() & 0o777
}

#[cfg(not(unix))]
fn permission_bits(metadata: &Metadata) -> u32 {
    if metadata.permissions().readonly() {
        0o444
    } else {
        0o644
    }
}

fn symbolic_mode(bits: u32, directory: bool, symlink: bool) -> String {
    let mut mode = String::with_capacity(10);
    mode.push(if symlink {
        'l'
    } else if directory {
        'd'
    } else {
        '-'
    });
    for shift in [6_u32, 3, 0] {
        let triplet = (bits >> shift) & 0o7;
        mode.push(if triplet & 0o4 == 0 { '-' } else { 'r' });
        mode.push(if triplet & 0o2 == 0 { '-' } else { 'w' });
        mode.push(if triplet & 0o1 == 0 { '-' } else { 'x' });
    }
    mode
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn symbolic_mode_renders_triplets() {
        assert_eq!(symbolic_mode(0o644, false, false), "-rw-r--r--");
        assert_eq!(symbolic_mode(0o755, true, false), "drwxr-xr-x");
        assert_eq!(symbolic_mode(0o777, false, true), "lrwxrwxrwx");
    }

    #[test]
    fn from_metadata_captures_file_shape() -> Result<(), Box<dyn Error>> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("notes.txt");
        std::fs::write(&path, "hello")?;
        let metadata = std::fs::metadata(&path)?;

        let stat = FileStat::from_metadata("notes.txt", &metadata, false, "text/plain");
        assert_eq!(stat.size, 5);
        assert!(stat.file);
        assert!(!stat.directory);
        assert_eq!(stat.mode.len(), 10);

        let retagged = stat.with_mimetype(ARCHIVE_MIMETYPE);
        assert_eq!(retagged.mimetype, ARCHIVE_MIMETYPE);

        let json = serde_json::to_value(&retagged)?;
        assert_eq!(json["name"], "notes.txt");
        Ok(())
    }
}
