//! Typed configuration model.

use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::defaults;

/// Root configuration document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HangarConfig {
    /// HTTP listener settings.
    pub api: ApiConfig,
    /// Logging settings.
    pub logging: LoggingSettings,
    /// Filesystem capability tunables shared by every server.
    pub filesystem: FilesystemConfig,
    /// Managed servers, one workspace root each.
    pub servers: Vec<ServerConfig>,
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ApiConfig {
    /// Address the listener binds to.
    pub bind_addr: IpAddr,
    /// Port the listener binds to.
    pub http_port: u16,
    /// Largest accepted request body for file writes.
    pub max_upload_bytes: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: defaults::BIND_ADDR,
            http_port: defaults::HTTP_PORT,
            max_upload_bytes: defaults::MAX_UPLOAD_BYTES,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingSettings {
    /// Filter directive, e.g. `info` or `hangar_fsops=debug`.
    pub level: String,
    /// `json` or `pretty`; inferred from the build profile when absent.
    pub format: Option<String>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: defaults::LOG_LEVEL.to_string(),
            format: None,
        }
    }
}

/// Filesystem capability tunables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilesystemConfig {
    /// Seconds a computed disk usage figure stays valid.
    pub disk_usage_ttl_secs: u64,
    /// Highest `copy N` suffix tried when duplicating a file.
    pub copy_suffix_limit: u32,
}

impl FilesystemConfig {
    /// Disk usage cache window as a [`Duration`].
    #[must_use]
    pub const fn disk_usage_ttl(&self) -> Duration {
        Duration::from_secs(self.disk_usage_ttl_secs)
    }
}

impl Default for FilesystemConfig {
    fn default() -> Self {
        Self {
            disk_usage_ttl_secs: defaults::DISK_USAGE_TTL_SECS,
            copy_suffix_limit: defaults::COPY_SUFFIX_LIMIT,
        }
    }
}

/// A single managed server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Identifier used in request paths.
    pub id: String,
    /// Absolute workspace root.
    pub root: PathBuf,
    /// Disk quota in bytes; `0` is unlimited.
    #[serde(default)]
    pub disk_limit_bytes: u64,
}
