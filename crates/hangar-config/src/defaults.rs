//! Default values applied when a configuration field is omitted.

use std::net::{IpAddr, Ipv4Addr};

/// Default environment variable naming the configuration file.
pub const CONFIG_PATH_ENV: &str = "HANGAR_CONFIG";
/// Configuration file used when `HANGAR_CONFIG` is unset.
pub const DEFAULT_CONFIG_PATH: &str = "config.yml";

pub(crate) const BIND_ADDR: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);
pub(crate) const HTTP_PORT: u16 = 8080;
pub(crate) const MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;
pub(crate) const LOG_LEVEL: &str = "info";
pub(crate) const DISK_USAGE_TTL_SECS: u64 = 60;
pub(crate) const COPY_SUFFIX_LIMIT: u32 = 50;
