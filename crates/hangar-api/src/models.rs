//! Request and response bodies for the file API.

use hangar_fsops::RenameItem;
use serde::{Deserialize, Serialize};

/// RFC9457-compatible problem document surfaced on validation/runtime errors.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProblemDetails {
    #[serde(rename = "type")]
    /// URI reference identifying the problem type.
    pub kind: String,
    /// Short, human-readable summary of the issue.
    pub title: String,
    /// HTTP status code associated with the error.
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Detailed diagnostic message when available.
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Parameters that failed validation, if applicable.
    pub invalid_params: Option<Vec<ProblemInvalidParam>>,
}

/// Invalid parameter pointer surfaced alongside a [`ProblemDetails`] payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProblemInvalidParam {
    /// JSON Pointer to the offending field.
    pub pointer: String,
    /// Human-readable description of the validation failure.
    pub message: String,
}

/// `GET contents` query.
#[derive(Debug, Clone, Deserialize)]
pub struct ContentsQuery {
    /// File to read, relative to the server root.
    pub file: String,
    /// Any non-empty value requests attachment headers.
    #[serde(default)]
    pub download: Option<String>,
}

impl ContentsQuery {
    pub(crate) fn wants_download(&self) -> bool {
        self.download.as_deref().is_some_and(|value| !value.is_empty())
    }
}

/// `GET list-directory` query.
#[derive(Debug, Clone, Deserialize)]
pub struct ListDirectoryQuery {
    /// Directory to list; the server root when omitted.
    #[serde(default = "root_directory")]
    pub directory: String,
}

fn root_directory() -> String {
    "/".to_string()
}

/// `POST write` query.
#[derive(Debug, Clone, Deserialize)]
pub struct WriteQuery {
    /// File to create or replace.
    pub file: String,
}

/// `PUT rename` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenameRequest {
    /// Directory every item is relative to.
    pub root: String,
    /// Moves to apply.
    pub files: Vec<RenameItem>,
}

/// `POST delete` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteRequest {
    /// Directory every item is relative to.
    pub root: String,
    /// Paths to remove.
    pub files: Vec<String>,
}

/// `POST copy` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CopyRequest {
    /// File to duplicate.
    pub location: String,
}

/// `POST create-directory` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDirectoryRequest {
    /// New directory name.
    pub name: String,
    /// Parent directory.
    pub path: String,
}

/// `POST compress` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressRequest {
    /// Directory the archive is written to and entries are relative to.
    pub root: String,
    /// Entries to include.
    pub files: Vec<String>,
}

/// `POST decompress` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecompressRequest {
    /// Directory the archive is extracted into.
    pub root: String,
    /// Archive, relative to `root`.
    pub file: String,
}

/// `GET /health` response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthResponse {
    /// Always `ok` when the process is serving.
    pub status: String,
    /// Build revision.
    pub build: String,
    /// Batch items that hard-failed since start.
    pub batch_item_failures: u64,
    /// Archive requests refused for lack of space since start.
    pub archive_conflicts: u64,
}
