//! Load the YAML document and layer environment overrides on top.

use std::env;
use std::fs;
use std::io;
use std::net::IpAddr;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::defaults::{CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH};
use crate::error::{ConfigError, ConfigResult};
use crate::model::HangarConfig;
use crate::validate::validate;

const BIND_ADDR_ENV: &str = "HANGAR_BIND_ADDR";
const HTTP_PORT_ENV: &str = "HANGAR_HTTP_PORT";
const LOG_LEVEL_ENV: &str = "HANGAR_LOG_LEVEL";
const LOG_FORMAT_ENV: &str = "HANGAR_LOG_FORMAT";

/// Resolve the configuration path from `HANGAR_CONFIG`, load it, apply environment
/// overrides and validate the result.
///
/// # Errors
///
/// Returns an error when the file cannot be read or parsed, an override is malformed, or
/// validation fails.
pub fn load_from_env() -> ConfigResult<HangarConfig> {
    let lookup = |key: &str| env::var(key).ok();
    match lookup(CONFIG_PATH_ENV) {
        Some(path) => load(Path::new(&path), true, lookup),
        None => load(Path::new(DEFAULT_CONFIG_PATH), false, lookup),
    }
}

/// Load and validate a configuration file without consulting the environment.
///
/// # Errors
///
/// Returns an error when the file cannot be read or parsed or fails validation.
pub fn load_from_path(path: &Path) -> ConfigResult<HangarConfig> {
    load(path, true, |_| None)
}

fn load(
    path: &Path,
    required: bool,
    lookup: impl Fn(&str) -> Option<String>,
) -> ConfigResult<HangarConfig> {
    let mut config = match fs::read_to_string(path) {
        Ok(raw) => parse(&raw, path)?,
        Err(err) if err.kind() == io::ErrorKind::NotFound && !required => {
            warn!(path = %path.display(), "configuration file not found; using defaults");
            HangarConfig::default()
        }
        Err(source) => {
            return Err(ConfigError::Io {
                operation: "config.read",
                path: path.to_path_buf(),
                source,
            });
        }
    };
    apply_overrides(&mut config, lookup)?;
    validate(&config)?;
    info!(
        path = %path.display(),
        servers = config.servers.len(),
        "configuration loaded"
    );
    Ok(config)
}

/// Parse a YAML document into the configuration model.
///
/// # Errors
///
/// Returns [`ConfigError::Parse`] when the document does not match the model.
pub fn parse(raw: &str, path: &Path) -> ConfigResult<HangarConfig> {
    if raw.trim().is_empty() {
        return Ok(HangarConfig::default());
    }
    serde_yaml::from_str(raw).map_err(|source| ConfigError::Parse {
        path: PathBuf::from(path),
        source,
    })
}

/// Apply `HANGAR_*` overrides obtained from `lookup`.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] when an override cannot be parsed.
pub fn apply_overrides(
    config: &mut HangarConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> ConfigResult<()> {
    if let Some(raw) = lookup(BIND_ADDR_ENV) {
        config.api.bind_addr = raw.trim().parse::<IpAddr>().map_err(|_| {
            ConfigError::invalid("env", BIND_ADDR_ENV, Some(raw.clone()), "not an IP address")
        })?;
    }
    if let Some(raw) = lookup(HTTP_PORT_ENV) {
        config.api.http_port = raw.trim().parse::<u16>().map_err(|_| {
            ConfigError::invalid("env", HTTP_PORT_ENV, Some(raw.clone()), "not a port number")
        })?;
    }
    if let Some(level) = lookup(LOG_LEVEL_ENV) {
        config.logging.level = level;
    }
    if let Some(format) = lookup(LOG_FORMAT_ENV) {
        config.logging.format = Some(format);
    }
    Ok(())
}
