//! Semantic validation applied after parsing.

use std::collections::HashSet;

use crate::error::{ConfigError, ConfigResult};
use crate::model::HangarConfig;

/// Validate cross-field constraints the type system cannot express.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] describing the first violation.
pub fn validate(config: &HangarConfig) -> ConfigResult<()> {
    if config.api.http_port == 0 {
        return Err(ConfigError::invalid(
            "api",
            "http_port",
            Some("0".to_string()),
            "must be non-zero",
        ));
    }
    if config.api.max_upload_bytes == 0 {
        return Err(ConfigError::invalid(
            "api",
            "max_upload_bytes",
            Some("0".to_string()),
            "must be non-zero",
        ));
    }
    if config.logging.level.trim().is_empty() {
        return Err(ConfigError::invalid(
            "logging",
            "level",
            None,
            "must not be empty",
        ));
    }

    let mut seen = HashSet::new();
    for (index, server) in config.servers.iter().enumerate() {
        let field = |name: &str| format!("servers[{index}].{name}");
        if server.id.trim().is_empty() {
            return Err(ConfigError::invalid(
                "servers",
                field("id"),
                None,
                "must not be empty",
            ));
        }
        if server.id.contains('/') {
            return Err(ConfigError::invalid(
                "servers",
                field("id"),
                Some(server.id.clone()),
                "must not contain '/'",
            ));
        }
        if !seen.insert(server.id.as_str()) {
            return Err(ConfigError::invalid(
                "servers",
                field("id"),
                Some(server.id.clone()),
                "must be unique",
            ));
        }
        if !server.root.is_absolute() {
            return Err(ConfigError::invalid(
                "servers",
                field("root"),
                Some(server.root.display().to_string()),
                "must be an absolute path",
            ));
        }
    }
    Ok(())
}
