//! Error types for telemetry operations.

use std::string::FromUtf8Error;

use thiserror::Error;
use tracing_subscriber::util::TryInitError;

/// Result alias for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Errors raised while installing logging or maintaining the metrics registry.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// A global tracing subscriber was already installed.
    #[error("tracing subscriber already installed")]
    SubscriberInstall {
        /// Underlying tracing subscriber error.
        source: TryInitError,
    },
    /// A Prometheus registry call failed.
    #[error("metrics registry operation failed")]
    Metrics {
        /// Registry step that failed (`metrics.build`, `metrics.register`, `metrics.encode`).
        operation: &'static str,
        /// Counter family involved, when the failure is tied to one.
        family: Option<&'static str>,
        /// Underlying Prometheus error.
        source: prometheus::Error,
    },
    /// The text exposition was not valid UTF-8.
    #[error("metrics exposition was not valid utf-8")]
    Exposition {
        /// Underlying UTF-8 conversion error.
        source: FromUtf8Error,
    },
}

impl TelemetryError {
    pub(crate) const fn metrics(
        operation: &'static str,
        family: Option<&'static str>,
        source: prometheus::Error,
    ) -> Self {
        Self::Metrics {
            operation,
            family,
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn metrics_helper_keeps_operation_and_family() {
        let err = TelemetryError::metrics(
            "metrics.register",
            Some("hangar_batch_items_total"),
            prometheus::Error::AlreadyReg,
        );
        assert!(matches!(
            err,
            TelemetryError::Metrics {
                operation: "metrics.register",
                family: Some("hangar_batch_items_total"),
                ..
            }
        ));
        assert_eq!(err.to_string(), "metrics registry operation failed");
        assert!(err.source().is_some());
    }

    #[test]
    fn exposition_error_wraps_utf8_failure() -> Result<(), Box<dyn Error>> {
        let source = String::from_utf8(vec![0, 159])
            .err()
            .ok_or("expected invalid utf-8")?;
        let err = TelemetryError::Exposition { source };
        assert_eq!(err.to_string(), "metrics exposition was not valid utf-8");
        assert!(err.source().is_some());
        Ok(())
    }
}
