//! HTTP surface modules (router, handlers, middleware).

/// Shared constants and header names for HTTP surfaces.
pub(crate) mod constants;
/// Problem response helpers and error types.
pub(crate) mod errors;
/// Server file management handlers.
pub(crate) mod files;
/// Health and diagnostics endpoints.
pub(crate) mod health;
/// Router construction and server host.
pub mod router;
/// Metrics middleware for HTTP requests.
pub(crate) mod telemetry;
