//! Server lookup by identifier.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use hangar_config::HangarConfig;
use hangar_fs::{Filesystem, LocalFilesystem, LocalFilesystemOptions};
use tracing::info;

use crate::error::{FileOpsError, FileOpsResult};

/// A managed server and its filesystem capability.
#[derive(Clone)]
pub struct Server {
    id: String,
    filesystem: Arc<dyn Filesystem>,
}

impl Server {
    /// Pair an identifier with a filesystem.
    #[must_use]
    pub fn new(id: impl Into<String>, filesystem: Arc<dyn Filesystem>) -> Self {
        Self {
            id: id.into(),
            filesystem,
        }
    }

    /// Server identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Shared handle to the server filesystem.
    #[must_use]
    pub fn filesystem(&self) -> Arc<dyn Filesystem> {
        Arc::clone(&self.filesystem)
    }
}

impl fmt::Debug for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Server").field("id", &self.id).finish_non_exhaustive()
    }
}

/// Resolves request server identifiers.
pub trait ServerLookup: Send + Sync {
    /// Fetch a server by id.
    fn get(&self, id: &str) -> Option<Arc<Server>>;
}

/// In-memory registry of configured servers.
#[derive(Debug, Clone, Default)]
pub struct ServerRegistry {
    servers: HashMap<String, Arc<Server>>,
}

impl ServerRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a [`LocalFilesystem`] for each configured server.
    ///
    /// # Errors
    ///
    /// Returns [`FileOpsError::Failure`] when a server root cannot be created or canonicalised.
    pub fn from_config(config: &HangarConfig) -> FileOpsResult<Self> {
        let mut registry = Self::new();
        for server in &config.servers {
            let options = LocalFilesystemOptions {
                disk_limit_bytes: server.disk_limit_bytes,
                usage_ttl: config.filesystem.disk_usage_ttl(),
                copy_suffix_limit: config.filesystem.copy_suffix_limit,
            };
            let filesystem = LocalFilesystem::new(&server.root, options).map_err(|source| {
                FileOpsError::Failure {
                    operation: "registry.open_root",
                    source,
                }
            })?;
            info!(
                server = %server.id,
                root = %filesystem.root().display(),
                disk_limit_bytes = server.disk_limit_bytes,
                "server registered"
            );
            registry.insert(Server::new(server.id.clone(), Arc::new(filesystem)));
        }
        Ok(registry)
    }

    /// Add or replace a server.
    pub fn insert(&mut self, server: Server) {
        self.servers.insert(server.id.clone(), Arc::new(server));
    }

    /// Number of registered servers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.servers.len()
    }

    /// Whether no servers are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }
}

impl ServerLookup for ServerRegistry {
    fn get(&self, id: &str) -> Option<Arc<Server>> {
        self.servers.get(id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hangar_config::ServerConfig;
    use std::error::Error;

    #[test]
    fn from_config_opens_each_root() -> Result<(), Box<dyn Error>> {
        let temp = tempfile::tempdir()?;
        let config = HangarConfig {
            servers: vec![
                ServerConfig {
                    id: "alpha".to_string(),
                    root: temp.path().join("alpha"),
                    disk_limit_bytes: 0,
                },
                ServerConfig {
                    id: "beta".to_string(),
                    root: temp.path().join("beta"),
                    disk_limit_bytes: 4096,
                },
            ],
            ..HangarConfig::default()
        };

        let registry = ServerRegistry::from_config(&config)?;
        assert_eq!(registry.len(), 2);
        assert!(temp.path().join("alpha").is_dir());
        let beta = registry.get("beta").ok_or("beta missing")?;
        assert_eq!(beta.id(), "beta");
        assert!(registry.get("gamma").is_none());
        Ok(())
    }

    #[test]
    fn empty_registry_resolves_nothing() {
        let registry = ServerRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.get("alpha").is_none());
    }
}
