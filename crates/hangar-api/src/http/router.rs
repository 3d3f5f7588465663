//! Router construction and server host for the API.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    extract::{DefaultBodyLimit, MatchedPath},
    http::{HeaderName, Method, Request, header::CONTENT_TYPE},
    routing::{get, post, put},
};
use hangar_fsops::ServerLookup;
use hangar_telemetry::{Metrics, build_sha};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::Span;

use crate::error::{ApiServerError, ApiServerResult};
use crate::http::constants::HEADER_REQUEST_ID;
use crate::http::files;
use crate::http::health::{health, metrics};
use crate::http::telemetry::HttpMetricsLayer;
use crate::state::ApiState;

/// Axum router wrapper that hosts the file API.
pub struct ApiServer {
    router: Router,
}

impl ApiServer {
    /// Construct the API over the given server lookup.
    ///
    /// `max_upload_bytes` bounds the body accepted by the write endpoint.
    #[must_use]
    pub fn new(servers: Arc<dyn ServerLookup>, telemetry: Metrics, max_upload_bytes: usize) -> Self {
        let state = Arc::new(ApiState::new(servers, telemetry.clone()));
        let cors_layer = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
            .allow_headers([CONTENT_TYPE, HeaderName::from_static(HEADER_REQUEST_ID)]);
        let trace_layer = TraceLayer::new_for_http()
            .make_span_with(|request: &Request<_>| {
                let route = request
                    .extensions()
                    .get::<MatchedPath>()
                    .map_or_else(|| request.uri().path(), MatchedPath::as_str);
                let request_id = request
                    .headers()
                    .get(HEADER_REQUEST_ID)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("");

                tracing::info_span!(
                    "http.request",
                    method = %request.method(),
                    route = %route,
                    request_id = %request_id,
                    build_sha = %build_sha(),
                    status_code = tracing::field::Empty,
                    latency_ms = tracing::field::Empty
                )
            })
            .on_request(|_request: &Request<_>, _span: &Span| {})
            .on_response(
                |response: &axum::response::Response, latency: Duration, span: &Span| {
                    span.record("status_code", response.status().as_u16());
                    let latency_ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
                    span.record("latency_ms", latency_ms);
                },
            );
        let layered = ServiceBuilder::new()
            .layer(hangar_telemetry::set_request_id_layer())
            .layer(hangar_telemetry::propagate_request_id_layer())
            .layer(trace_layer)
            .layer(HttpMetricsLayer::new(telemetry));

        let router = Self::public_routes()
            .merge(Self::file_routes())
            .layer(DefaultBodyLimit::max(max_upload_bytes))
            .layer(cors_layer)
            .route_layer(layered)
            .with_state(state);

        Self { router }
    }

    fn public_routes() -> Router<Arc<ApiState>> {
        Router::new()
            .route("/health", get(health))
            .route("/metrics", get(metrics))
    }

    fn file_routes() -> Router<Arc<ApiState>> {
        Router::new()
            .route("/api/servers/{server}/files/contents", get(files::contents))
            .route(
                "/api/servers/{server}/files/list-directory",
                get(files::list_directory),
            )
            .route("/api/servers/{server}/files/rename", put(files::rename))
            .route("/api/servers/{server}/files/copy", post(files::copy))
            .route("/api/servers/{server}/files/delete", post(files::delete))
            .route("/api/servers/{server}/files/write", post(files::write))
            .route(
                "/api/servers/{server}/files/create-directory",
                post(files::create_directory),
            )
            .route("/api/servers/{server}/files/compress", post(files::compress))
            .route(
                "/api/servers/{server}/files/decompress",
                post(files::decompress),
            )
    }

    /// Serve the API on `addr` until `shutdown` resolves.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener fails to bind or the server terminates unexpectedly.
    pub async fn serve<F>(self, addr: SocketAddr, shutdown: F) -> ApiServerResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ApiServerError::Bind { addr, source })?;
        tracing::info!(%addr, "starting api");
        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|source| ApiServerError::Serve { source })
    }

    #[cfg(test)]
    pub(crate) const fn router(&self) -> &Router {
        &self.router
    }
}
