//! # Design
//!
//! - Centralize application-level errors for bootstrap and serving.
//! - Keep error messages constant while carrying context fields for debugging.
//! - Preserve source errors without re-logging at call sites.

use thiserror::Error;

/// Result alias for application operations.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration operations failed.
    #[error("configuration operation failed")]
    Config {
        /// Operation identifier.
        operation: &'static str,
        /// Source configuration error.
        source: hangar_config::ConfigError,
    },
    /// Server registry construction failed.
    #[error("server registry operation failed")]
    FileOps {
        /// Operation identifier.
        operation: &'static str,
        /// Source file operation error.
        source: hangar_fsops::FileOpsError,
    },
    /// API server operations failed.
    #[error("api server operation failed")]
    ApiServer {
        /// Operation identifier.
        operation: &'static str,
        /// Source API server error.
        source: hangar_api::ApiServerError,
    },
    /// Telemetry operations failed.
    #[error("telemetry operation failed")]
    Telemetry {
        /// Operation identifier.
        operation: &'static str,
        /// Source telemetry error.
        source: hangar_telemetry::TelemetryError,
    },
    /// Configuration values were invalid.
    #[error("invalid configuration")]
    InvalidConfig {
        /// Field name that failed validation.
        field: &'static str,
        /// Machine-readable reason for the failure.
        reason: &'static str,
        /// Optional value associated with the failure.
        value: Option<String>,
    },
}

impl AppError {
    pub(crate) const fn config(operation: &'static str, source: hangar_config::ConfigError) -> Self {
        Self::Config { operation, source }
    }

    pub(crate) const fn file_ops(
        operation: &'static str,
        source: hangar_fsops::FileOpsError,
    ) -> Self {
        Self::FileOps { operation, source }
    }

    pub(crate) const fn api_server(
        operation: &'static str,
        source: hangar_api::ApiServerError,
    ) -> Self {
        Self::ApiServer { operation, source }
    }

    pub(crate) const fn telemetry(
        operation: &'static str,
        source: hangar_telemetry::TelemetryError,
    ) -> Self {
        Self::Telemetry { operation, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;
    use std::io;

    #[test]
    fn app_error_helpers_build_variants() -> Result<(), Box<dyn Error>> {
        let config = AppError::config(
            "config.load",
            hangar_config::ConfigError::InvalidField {
                section: "api",
                field: "http_port".to_string(),
                value: Some("0".to_string()),
                reason: "must be non-zero",
            },
        );
        assert!(matches!(config, AppError::Config { .. }));
        assert_eq!(config.to_string(), "configuration operation failed");
        assert!(config.source().is_some());

        let api = AppError::api_server(
            "api_server.serve",
            hangar_api::ApiServerError::Bind {
                addr: "127.0.0.1:8080".parse()?,
                source: io::Error::new(io::ErrorKind::AddrInUse, "busy"),
            },
        );
        assert!(matches!(api, AppError::ApiServer { .. }));

        let registry = AppError::file_ops(
            "registry.from_config",
            hangar_fsops::FileOpsError::InvalidInput {
                field: "servers",
                reason: "must not be empty",
            },
        );
        assert!(matches!(registry, AppError::FileOps { .. }));

        let utf8 = String::from_utf8(vec![0, 159])
            .err()
            .ok_or("expected invalid utf-8")?;
        let telemetry = AppError::telemetry(
            "telemetry.metrics",
            hangar_telemetry::TelemetryError::Exposition { source: utf8 },
        );
        assert!(matches!(telemetry, AppError::Telemetry { .. }));

        let invalid = AppError::InvalidConfig {
            field: "logging.format",
            reason: "unknown_format",
            value: Some("xml".to_string()),
        };
        assert_eq!(invalid.to_string(), "invalid configuration");
        assert!(invalid.source().is_none());
        Ok(())
    }
}
