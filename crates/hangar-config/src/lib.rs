#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions)]

//! Daemon configuration: YAML document, environment overrides and validation.

mod defaults;
pub mod error;
pub mod loader;
pub mod model;
pub mod validate;

pub use defaults::{CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH};
pub use error::{ConfigError, ConfigResult};
pub use loader::{apply_overrides, load_from_env, load_from_path, parse};
pub use model::{ApiConfig, FilesystemConfig, HangarConfig, LoggingSettings, ServerConfig};
pub use validate::validate;
