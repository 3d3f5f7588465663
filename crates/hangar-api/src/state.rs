//! Shared request state.

use std::sync::Arc;

use hangar_fs::Filesystem;
use hangar_fsops::{ArchiveWorkflow, BatchExecutor, ServerLookup};
use hangar_telemetry::Metrics;

use crate::http::errors::ApiError;

pub(crate) struct ApiState {
    servers: Arc<dyn ServerLookup>,
    pub(crate) batches: BatchExecutor,
    pub(crate) archives: ArchiveWorkflow,
    pub(crate) telemetry: Metrics,
}

impl ApiState {
    pub(crate) fn new(servers: Arc<dyn ServerLookup>, telemetry: Metrics) -> Self {
        Self {
            servers,
            batches: BatchExecutor::new(telemetry.clone()),
            archives: ArchiveWorkflow::new(telemetry.clone()),
            telemetry,
        }
    }

    /// Filesystem of the server addressed by the request path.
    pub(crate) fn filesystem(&self, server: &str) -> Result<Arc<dyn Filesystem>, ApiError> {
        self.servers
            .get(server)
            .map(|server| server.filesystem())
            .ok_or_else(|| ApiError::not_found("the requested server does not exist"))
    }
}
