//! Prometheus-backed metrics registry.
//!
//! # Design
//! - Encapsulates collector registration to keep the public API small.
//! - Counters are labelled by operation and outcome so failures and conflicts are visible.

use std::sync::Arc;

use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};

use crate::error::{TelemetryError, TelemetryResult};

const BATCH_ACTIONS: &[&str] = &["rename", "delete"];
const ARCHIVE_OPERATIONS: &[&str] = &["compress", "decompress"];

/// Prometheus-backed metrics registry shared across services.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    http_requests_total: IntCounterVec,
    batch_items_total: IntCounterVec,
    archive_operations_total: IntCounterVec,
}

/// Point-in-time counter totals used by the health endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Batch items that hard-failed.
    pub batch_item_failures: u64,
    /// Archive operations rejected for lack of space.
    pub archive_conflicts: u64,
}

impl Metrics {
    /// Construct a new metrics registry with the standard collectors registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the Prometheus collectors cannot be built or registered.
    pub fn new() -> TelemetryResult<Self> {
        let registry = Registry::new();

        let http_requests_total = counter_vec(
            "http_requests_total",
            "Total HTTP requests received",
            &["route", "code"],
        )?;
        let batch_items_total = counter_vec(
            "file_batch_items_total",
            "Batch rename/delete items processed by outcome",
            &["action", "outcome"],
        )?;
        let archive_operations_total = counter_vec(
            "file_archive_operations_total",
            "Compress/decompress requests by outcome",
            &["operation", "outcome"],
        )?;

        register(&registry, "http_requests_total", &http_requests_total)?;
        register(&registry, "file_batch_items_total", &batch_items_total)?;
        register(
            &registry,
            "file_archive_operations_total",
            &archive_operations_total,
        )?;

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                http_requests_total,
                batch_items_total,
                archive_operations_total,
            }),
        })
    }

    /// Increment the HTTP request counter for the given route and status code.
    pub fn inc_http_request(&self, route: &str, status: u16) {
        let code = status.to_string();
        self.inner
            .http_requests_total
            .with_label_values(&[route, code.as_str()])
            .inc();
    }

    /// Count one processed batch item.
    pub fn inc_batch_item(&self, action: &str, outcome: &str) {
        self.inner
            .batch_items_total
            .with_label_values(&[action, outcome])
            .inc();
    }

    /// Count one archive request.
    pub fn inc_archive_operation(&self, operation: &str, outcome: &str) {
        self.inner
            .archive_operations_total
            .with_label_values(&[operation, outcome])
            .inc();
    }

    /// Render the registry in the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails or the output is not valid UTF-8.
    pub fn render(&self) -> TelemetryResult<String> {
        let encoder = TextEncoder::new();
        let families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&families, &mut buffer)
            .map_err(|source| TelemetryError::metrics("metrics.encode", None, source))?;
        String::from_utf8(buffer).map_err(|source| TelemetryError::Exposition { source })
    }

    /// Take a snapshot of the counters surfaced by health reporting.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        let batch = &self.inner.batch_items_total;
        let archive = &self.inner.archive_operations_total;
        MetricsSnapshot {
            batch_item_failures: BATCH_ACTIONS
                .iter()
                .map(|&action| batch.with_label_values(&[action, "failure"]).get())
                .sum(),
            archive_conflicts: ARCHIVE_OPERATIONS
                .iter()
                .map(|&operation| archive.with_label_values(&[operation, "conflict"]).get())
                .sum(),
        }
    }
}

fn counter_vec(
    name: &'static str,
    help: &str,
    labels: &[&str],
) -> TelemetryResult<IntCounterVec> {
    IntCounterVec::new(Opts::new(name, help), labels)
        .map_err(|source| TelemetryError::metrics("metrics.build", Some(name), source))
}

fn register(registry: &Registry, name: &'static str, vec: &IntCounterVec) -> TelemetryResult<()> {
    registry
        .register(Box::new(vec.clone()))
        .map_err(|source| TelemetryError::metrics("metrics.register", Some(name), source))
}
