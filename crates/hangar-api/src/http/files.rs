//! Server file management endpoints.
//!
//! # Design
//! - Every route is scoped to one server; unknown servers are 404 before any IO.
//! - Batch and archive requests go through the shared executors; single-target calls map
//!   filesystem errors directly.
//! - Request bodies that fail to parse become problem documents, never plain-text rejections.

use std::sync::Arc;

use axum::{
    Json,
    body::{Body, Bytes},
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{StatusCode, header},
    response::Response,
};
use hangar_fs::FileStat;
use tokio_util::io::ReaderStream;
use tracing::{debug, error, info};

use crate::http::constants::HEADER_MIME_TYPE;
use crate::http::errors::ApiError;
use crate::models::{
    CompressRequest, ContentsQuery, CopyRequest, CreateDirectoryRequest, DecompressRequest,
    DeleteRequest, ListDirectoryQuery, RenameRequest, WriteQuery,
};
use crate::state::ApiState;

type JsonBody<T> = Result<Json<T>, JsonRejection>;
type QueryParams<T> = Result<Query<T>, QueryRejection>;

pub(crate) async fn contents(
    State(state): State<Arc<ApiState>>,
    Path(server): Path<String>,
    query: QueryParams<ContentsQuery>,
) -> Result<Response, ApiError> {
    let Query(query) = query?;
    let fs = state.filesystem(&server)?;
    let (stat, file) = fs
        .open(&query.file)
        .await
        .map_err(|err| ApiError::from_fs("contents", err))?;

    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(HEADER_MIME_TYPE, stat.mimetype.as_str())
        .header(header::CONTENT_LENGTH, stat.size);
    if query.wants_download() {
        builder = builder
            .header(
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={}", quoted(&stat.name)),
            )
            .header(header::CONTENT_TYPE, "application/octet-stream");
    }
    builder
        .body(Body::from_stream(ReaderStream::new(file)))
        .map_err(|err| {
            error!(error = %err, file = %query.file, "failed to build contents response");
            ApiError::internal("failed to build contents response")
        })
}

fn quoted(name: &str) -> String {
    let escaped: String = name
        .chars()
        .filter(|ch| !ch.is_control())
        .map(|ch| if ch == '"' { '\'' } else { ch })
        .collect();
    format!("\"{escaped}\"")
}

pub(crate) async fn list_directory(
    State(state): State<Arc<ApiState>>,
    Path(server): Path<String>,
    query: QueryParams<ListDirectoryQuery>,
) -> Result<Json<Vec<FileStat>>, ApiError> {
    let Query(query) = query?;
    let fs = state.filesystem(&server)?;
    let entries = fs
        .list(&query.directory)
        .await
        .map_err(|err| ApiError::from_fs("list", err))?;
    Ok(Json(entries))
}

pub(crate) async fn rename(
    State(state): State<Arc<ApiState>>,
    Path(server): Path<String>,
    payload: JsonBody<RenameRequest>,
) -> Result<StatusCode, ApiError> {
    let Json(request) = payload?;
    let fs = state.filesystem(&server)?;
    state.batches.rename(fs, &request.root, request.files).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn delete(
    State(state): State<Arc<ApiState>>,
    Path(server): Path<String>,
    payload: JsonBody<DeleteRequest>,
) -> Result<StatusCode, ApiError> {
    let Json(request) = payload?;
    let fs = state.filesystem(&server)?;
    state.batches.delete(fs, &request.root, request.files).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn copy(
    State(state): State<Arc<ApiState>>,
    Path(server): Path<String>,
    payload: JsonBody<CopyRequest>,
) -> Result<StatusCode, ApiError> {
    let Json(request) = payload?;
    let fs = state.filesystem(&server)?;
    fs.copy(&request.location)
        .await
        .map_err(|err| ApiError::from_fs("copy", err))?;
    debug!(server = %server, location = %request.location, "file copied");
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn write(
    State(state): State<Arc<ApiState>>,
    Path(server): Path<String>,
    query: QueryParams<WriteQuery>,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let Query(query) = query?;
    let fs = state.filesystem(&server)?;
    fs.write(&query.file, &body)
        .await
        .map_err(|err| ApiError::from_fs("write", err))?;
    debug!(server = %server, file = %query.file, bytes = body.len(), "file written");
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn create_directory(
    State(state): State<Arc<ApiState>>,
    Path(server): Path<String>,
    payload: JsonBody<CreateDirectoryRequest>,
) -> Result<StatusCode, ApiError> {
    let Json(request) = payload?;
    let fs = state.filesystem(&server)?;
    fs.create_directory(&request.name, &request.path)
        .await
        .map_err(|err| ApiError::from_fs("mkdir", err))?;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn compress(
    State(state): State<Arc<ApiState>>,
    Path(server): Path<String>,
    payload: JsonBody<CompressRequest>,
) -> Result<Json<FileStat>, ApiError> {
    let Json(request) = payload?;
    let fs = state.filesystem(&server)?;
    let stat = state
        .archives
        .compress(fs.as_ref(), &request.root, &request.files)
        .await?;
    info!(server = %server, archive = %stat.name, "compress request completed");
    Ok(Json(stat))
}

pub(crate) async fn decompress(
    State(state): State<Arc<ApiState>>,
    Path(server): Path<String>,
    payload: JsonBody<DecompressRequest>,
) -> Result<StatusCode, ApiError> {
    let Json(request) = payload?;
    let fs = state.filesystem(&server)?;
    state
        .archives
        .decompress(fs.as_ref(), &request.root, &request.file)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Result, anyhow};
    use hangar_fs::{LocalFilesystem, LocalFilesystemOptions};
    use hangar_fsops::{RenameItem, Server, ServerRegistry};
    use hangar_telemetry::Metrics;
    use tempfile::TempDir;

    fn test_state() -> Result<(TempDir, Arc<ApiState>)> {
        let temp = tempfile::tempdir()?;
        let fs = LocalFilesystem::new(temp.path().join("alpha"), LocalFilesystemOptions::default())?;
        let mut registry = ServerRegistry::new();
        registry.insert(Server::new("alpha", Arc::new(fs)));
        let state = ApiState::new(Arc::new(registry), Metrics::new()?);
        Ok((temp, Arc::new(state)))
    }

    #[tokio::test]
    async fn rename_moves_files_and_returns_no_content() -> Result<()> {
        let (temp, state) = test_state()?;
        std::fs::write(temp.path().join("alpha/old.txt"), "data")?;

        let status = rename(
            State(state),
            Path("alpha".to_string()),
            Ok(Json(RenameRequest {
                root: "/".to_string(),
                files: vec![RenameItem {
                    from: "old.txt".to_string(),
                    to: "new.txt".to_string(),
                }],
            })),
        )
        .await
        .map_err(|err| anyhow!("rename failed: {err:?}"))?;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(temp.path().join("alpha/new.txt").is_file());
        Ok(())
    }

    #[tokio::test]
    async fn unknown_server_is_not_found() -> Result<()> {
        let (_temp, state) = test_state()?;
        let err = copy(
            State(state),
            Path("gamma".to_string()),
            Ok(Json(CopyRequest {
                location: "a.txt".to_string(),
            })),
        )
        .await
        .err()
        .ok_or_else(|| anyhow!("expected unknown server rejection"))?;
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.detail(), Some("the requested server does not exist"));
        Ok(())
    }

    #[tokio::test]
    async fn empty_delete_is_unprocessable() -> Result<()> {
        let (_temp, state) = test_state()?;
        let err = delete(
            State(state),
            Path("alpha".to_string()),
            Ok(Json(DeleteRequest {
                root: "/".to_string(),
                files: Vec::new(),
            })),
        )
        .await
        .err()
        .ok_or_else(|| anyhow!("expected empty batch rejection"))?;
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
        Ok(())
    }

    #[tokio::test]
    async fn copy_of_missing_file_is_not_found() -> Result<()> {
        let (_temp, state) = test_state()?;
        let err = copy(
            State(state),
            Path("alpha".to_string()),
            Ok(Json(CopyRequest {
                location: "missing.txt".to_string(),
            })),
        )
        .await
        .err()
        .ok_or_else(|| anyhow!("expected missing file rejection"))?;
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        Ok(())
    }

    #[tokio::test]
    async fn list_directory_on_a_file_is_not_found() -> Result<()> {
        let (temp, state) = test_state()?;
        std::fs::write(temp.path().join("alpha/file.txt"), "data")?;
        let err = list_directory(
            State(state),
            Path("alpha".to_string()),
            Ok(Query(ListDirectoryQuery {
                directory: "file.txt".to_string(),
            })),
        )
        .await
        .err()
        .ok_or_else(|| anyhow!("expected not-a-directory rejection"))?;
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        Ok(())
    }

    #[tokio::test]
    async fn create_directory_then_list() -> Result<()> {
        let (_temp, state) = test_state()?;
        let status = create_directory(
            State(state.clone()),
            Path("alpha".to_string()),
            Ok(Json(CreateDirectoryRequest {
                name: "plugins".to_string(),
                path: "/".to_string(),
            })),
        )
        .await
        .map_err(|err| anyhow!("mkdir failed: {err:?}"))?;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let Json(entries) = list_directory(
            State(state),
            Path("alpha".to_string()),
            Ok(Query(ListDirectoryQuery {
                directory: "/".to_string(),
            })),
        )
        .await
        .map_err(|err| anyhow!("list failed: {err:?}"))?;
        assert_eq!(entries.len(), 1);
        assert!(entries[0].directory);
        assert_eq!(entries[0].name, "plugins");
        Ok(())
    }

    #[test]
    fn attachment_names_are_quoted() {
        assert_eq!(quoted("world.zip"), "\"world.zip\"");
        assert_eq!(quoted("a\"b\n.txt"), "\"a'b.txt\"");
    }
}
