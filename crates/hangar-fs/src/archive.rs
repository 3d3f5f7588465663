//! Archive encoding and decoding for compress/decompress requests.
//!
//! # Design
//! - Compression always produces gzip-compressed tarballs.
//! - Decompression recognises `.tar`, `.tar.gz`/`.tgz` and `.zip` by extension.
//! - Every extracted entry is sanitised so it lands under the extraction target; link entries
//!   are refused and existing links that leave the target are never written through.
//! - Sizing walks entry headers only, so the space check never extracts data.

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use walkdir::WalkDir;
use zip::ZipArchive;

use crate::error::{FsError, FsResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ArchiveFormat {
    Tar,
    TarGz,
    Zip,
}

impl ArchiveFormat {
    pub(crate) fn detect(path: &Path) -> FsResult<Self> {
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Ok(Self::TarGz)
        } else if name.ends_with(".tar") {
            Ok(Self::Tar)
        } else if name.ends_with(".zip") {
            Ok(Self::Zip)
        } else {
            Err(FsError::UnsupportedArchive {
                path: path.to_path_buf(),
            })
        }
    }
}

/// Write a `.tar.gz` containing `sources`, stored relative to `base`.
pub(crate) fn create_tar_gz(base: &Path, sources: &[PathBuf], destination: &Path) -> FsResult<()> {
    let file = File::create(destination)
        .map_err(|err| FsError::io("archive.create", destination, err))?;
    let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
    builder.follow_symlinks(false);

    for source in sources {
        let metadata = fs::symlink_metadata(source)
            .map_err(|err| FsError::io("archive.stat_source", source, err))?;
        if metadata.is_dir() {
            for entry in WalkDir::new(source) {
                let entry = entry.map_err(|err| FsError::walkdir("archive.walk", source, err))?;
                // The archive being written may sit inside a compressed directory.
                if entry.path() == destination {
                    continue;
                }
                append_entry(&mut builder, base, entry.path())?;
            }
        } else if source != destination {
            append_entry(&mut builder, base, source)?;
        }
    }

    let encoder = builder
        .into_inner()
        .map_err(|err| FsError::io("archive.finish_tar", destination, err))?;
    encoder
        .finish()
        .map_err(|err| FsError::io("archive.finish_gzip", destination, err))?;
    Ok(())
}

fn append_entry<W: io::Write>(
    builder: &mut tar::Builder<W>,
    base: &Path,
    path: &Path,
) -> FsResult<()> {
    let relative = path.strip_prefix(base).unwrap_or(path);
    if relative.as_os_str().is_empty() {
        return Ok(());
    }
    builder
        .append_path_with_name(path, relative)
        .map_err(|err| FsError::io("archive.append", path, err))
}

/// Total uncompressed size of every entry in the archive.
pub(crate) fn uncompressed_size(path: &Path) -> FsResult<u64> {
    match ArchiveFormat::detect(path)? {
        ArchiveFormat::Tar => tar_size(open(path)?, path),
        ArchiveFormat::TarGz => tar_size(GzDecoder::new(open(path)?), path),
        ArchiveFormat::Zip => {
            let mut archive =
                ZipArchive::new(open(path)?).map_err(|err| FsError::zip("archive.open", path, err))?;
            let mut total = 0_u64;
            for index in 0..archive.len() {
                let entry = archive
                    .by_index(index)
                    .map_err(|err| FsError::zip("archive.read_entry", path, err))?;
                total = total.saturating_add(entry.size());
            }
            Ok(total)
        }
    }
}

fn tar_size<R: Read>(reader: R, path: &Path) -> FsResult<u64> {
    let mut archive = tar::Archive::new(reader);
    let entries = archive
        .entries()
        .map_err(|err| FsError::io("archive.entries", path, err))?;
    let mut total = 0_u64;
    for entry in entries {
        let entry = entry.map_err(|err| FsError::io("archive.read_entry", path, err))?;
        total = total.saturating_add(entry.size());
    }
    Ok(total)
}

/// Extract the archive into `target`.
pub(crate) fn extract(path: &Path, target: &Path) -> FsResult<()> {
    match ArchiveFormat::detect(path)? {
        ArchiveFormat::Tar => extract_tar(open(path)?, path, target),
        ArchiveFormat::TarGz => extract_tar(GzDecoder::new(open(path)?), path, target),
        ArchiveFormat::Zip => extract_zip(path, target),
    }
}

fn extract_tar<R: Read>(reader: R, path: &Path, target: &Path) -> FsResult<()> {
    let mut archive = tar::Archive::new(reader);
    let entries = archive
        .entries()
        .map_err(|err| FsError::io("archive.entries", path, err))?;
    for entry in entries {
        let mut entry = entry.map_err(|err| FsError::io("archive.read_entry", path, err))?;
        let name = entry
            .path()
            .map_err(|err| FsError::io("archive.entry_path", path, err))?
            .to_string_lossy()
            .into_owned();
        sanitize_entry(&name)?;
        // Links could point later entries outside the target.
        let kind = entry.header().entry_type();
        if kind.is_symlink() || kind.is_hard_link() {
            return Err(FsError::UnsafeArchiveEntry { entry: name });
        }
        let unpacked = entry
            .unpack_in(target)
            .map_err(|err| FsError::io("archive.unpack", target.join(&name), err))?;
        if !unpacked {
            return Err(FsError::UnsafeArchiveEntry { entry: name });
        }
    }
    Ok(())
}

fn extract_zip(path: &Path, target: &Path) -> FsResult<()> {
    let mut archive =
        ZipArchive::new(open(path)?).map_err(|err| FsError::zip("archive.open", path, err))?;
    let root =
        fs::canonicalize(target).map_err(|err| FsError::io("archive.target", target, err))?;

    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .map_err(|err| FsError::zip("archive.read_entry", path, err))?;
        let name = entry.name().to_string();
        let destination = root.join(sanitize_entry(&name)?);
        ensure_inside(&root, &destination, &name)?;

        if entry.is_dir() {
            fs::create_dir_all(&destination)
                .map_err(|err| FsError::io("archive.create_dir", &destination, err))?;
            continue;
        }
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)
                .map_err(|err| FsError::io("archive.create_parent", parent, err))?;
        }
        let mut output = File::create(&destination)
            .map_err(|err| FsError::io("archive.create_file", &destination, err))?;
        io::copy(&mut entry, &mut output)
            .map_err(|err| FsError::io("archive.write_file", &destination, err))?;

        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&destination, fs::Permissions::from_mode(mode & 0o777))
                .map_err(|err| FsError::io("archive.set_permissions", &destination, err))?;
        }
    }
    Ok(())
}

/// Refuse destinations whose deepest existing ancestor resolves outside `root`.
///
/// `root` must be canonical.
fn ensure_inside(root: &Path, destination: &Path, entry: &str) -> FsResult<()> {
    let unsafe_entry = || FsError::UnsafeArchiveEntry {
        entry: entry.to_string(),
    };
    let mut existing = destination;
    loop {
        match fs::symlink_metadata(existing) {
            Ok(_) => break,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                existing = existing.parent().ok_or_else(unsafe_entry)?;
            }
            Err(err) => return Err(FsError::io("archive.inspect", existing, err)),
        }
    }
    match fs::canonicalize(existing) {
        Ok(resolved) if resolved.starts_with(root) => Ok(()),
        // Escaping or dangling links.
        Ok(_) => Err(unsafe_entry()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Err(unsafe_entry()),
        Err(err) => Err(FsError::io("archive.inspect", existing, err)),
    }
}

fn open(path: &Path) -> FsResult<File> {
    File::open(path).map_err(|err| FsError::io("archive.open", path, err))
}

fn sanitize_entry(entry: &str) -> FsResult<PathBuf> {
    let path = Path::new(entry);
    let mut sanitized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(segment) => sanitized.push(segment),
            Component::CurDir => {}
            _ => {
                return Err(FsError::UnsafeArchiveEntry {
                    entry: entry.to_string(),
                });
            }
        }
    }
    if sanitized.as_os_str().is_empty() {
        return Err(FsError::UnsafeArchiveEntry {
            entry: entry.to_string(),
        });
    }
    Ok(sanitized)
}
