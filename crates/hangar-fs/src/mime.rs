//! Extension-based MIME detection.

use std::path::Path;

const DIRECTORY: &str = "inode/directory";
const FALLBACK: &str = "application/octet-stream";

const BY_EXTENSION: &[(&str, &str)] = &[
    ("txt", "text/plain; charset=utf-8"),
    ("log", "text/plain; charset=utf-8"),
    ("md", "text/markdown; charset=utf-8"),
    ("cfg", "text/plain; charset=utf-8"),
    ("conf", "text/plain; charset=utf-8"),
    ("ini", "text/plain; charset=utf-8"),
    ("properties", "text/plain; charset=utf-8"),
    ("env", "text/plain; charset=utf-8"),
    ("sh", "text/x-shellscript"),
    ("yml", "application/yaml"),
    ("yaml", "application/yaml"),
    ("toml", "application/toml"),
    ("json", "application/json"),
    ("xml", "application/xml"),
    ("html", "text/html; charset=utf-8"),
    ("css", "text/css; charset=utf-8"),
    ("js", "text/javascript; charset=utf-8"),
    ("csv", "text/csv; charset=utf-8"),
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
    ("svg", "image/svg+xml"),
    ("zip", "application/zip"),
    ("jar", "application/java-archive"),
    ("tar", "application/x-tar"),
    ("gz", "application/gzip"),
    ("tgz", "application/gzip"),
    ("db", "application/vnd.sqlite3"),
    ("sqlite", "application/vnd.sqlite3"),
];

/// Detect the MIME type of a path.
#[must_use]
pub fn detect(path: &Path, directory: bool) -> &'static str {
    if directory {
        return DIRECTORY;
    }
    let Some(extension) = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
    else {
        return FALLBACK;
    };
    BY_EXTENSION
        .iter()
        .find(|(known, _)| *known == extension)
        .map_or(FALLBACK, |&(_, mime)| mime)
}
