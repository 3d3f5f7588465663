use std::future::Future;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;

use hangar_api::ApiServer;
use hangar_config::HangarConfig;
use hangar_fsops::ServerRegistry;
use hangar_telemetry::{GlobalContextGuard, LogFormat, LoggingConfig, Metrics};
use tracing::{info, warn};

use crate::error::{AppError, AppResult};

/// Dependencies required to bootstrap the Hangar daemon.
pub(crate) struct BootstrapDependencies {
    config: HangarConfig,
    telemetry: Metrics,
}

impl BootstrapDependencies {
    /// Construct production dependencies from the environment for the binary entrypoint.
    pub(crate) fn from_env() -> AppResult<Self> {
        let config =
            hangar_config::load_from_env().map_err(|err| AppError::config("config.load", err))?;
        let telemetry =
            Metrics::new().map_err(|err| AppError::telemetry("telemetry.metrics", err))?;
        Ok(Self { config, telemetry })
    }
}

/// Entry point for the Hangar boot sequence.
///
/// # Errors
///
/// Returns an error if configuration, logging, server registration or the API listener fail.
pub async fn run_app() -> AppResult<()> {
    let dependencies = BootstrapDependencies::from_env()?;
    run_app_with(dependencies, shutdown_signal()).await
}

/// Boot sequence that relies entirely on injected dependencies to simplify testing.
pub(crate) async fn run_app_with<F>(
    dependencies: BootstrapDependencies,
    shutdown: F,
) -> AppResult<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let BootstrapDependencies { config, telemetry } = dependencies;

    let logging = LoggingConfig {
        level: &config.logging.level,
        format: log_format(config.logging.format.as_deref())?,
        ..LoggingConfig::default()
    };
    hangar_telemetry::init_logging(&logging)
        .map_err(|err| AppError::telemetry("telemetry.init", err))?;
    let _context = GlobalContextGuard::new("bootstrap");

    info!("Hangar bootstrap starting");

    let registry = ServerRegistry::from_config(&config)
        .map_err(|err| AppError::file_ops("registry.from_config", err))?;
    if registry.is_empty() {
        warn!("no servers configured; every file route will answer 404");
    }
    info!(servers = registry.len(), "server registry ready");

    let api = ApiServer::new(Arc::new(registry), telemetry, config.api.max_upload_bytes);
    let addr = SocketAddr::new(config.api.bind_addr, config.api.http_port);

    api.serve(addr, shutdown)
        .await
        .map_err(|err| AppError::api_server("api_server.serve", err))?;

    info!("API server shutdown complete");
    Ok(())
}

fn log_format(configured: Option<&str>) -> AppResult<LogFormat> {
    configured.map_or_else(
        || Ok(LogFormat::infer()),
        |value| {
            LogFormat::from_str(value).map_err(|()| AppError::InvalidConfig {
                field: "logging.format",
                reason: "unknown_format",
                value: Some(value.to_string()),
            })
        },
    )
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("shutdown signal received");
}
