//! Prometheus metrics for the registry services.
//!
//! All metrics follow the naming convention: `pr_<component>_<metric>_<unit>`
//!
//! Outcome labels use the wire names of `ErrorKind` plus `success`.

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts,
    Registry, TextEncoder,
};
use std::sync::Arc;

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // DISPATCH METRICS
    // =========================================================================

    /// Envelopes published by a dispatcher
    pub static ref DISPATCH_PUBLISHED: IntCounterVec = IntCounterVec::new(
        Opts::new("pr_dispatch_published_total", "Envelopes published"),
        &["topic", "event"]
    ).expect("metric creation failed");

    /// Envelopes accepted for delivery (first sighting of a message id)
    pub static ref DISPATCH_RECEIVED: IntCounterVec = IntCounterVec::new(
        Opts::new("pr_dispatch_received_total", "Envelopes accepted for delivery"),
        &["topic", "event"]
    ).expect("metric creation failed");

    /// Envelopes dropped as duplicates
    pub static ref DISPATCH_DUPLICATES: IntCounterVec = IntCounterVec::new(
        Opts::new("pr_dispatch_duplicates_total", "Envelopes suppressed by content-id dedup"),
        &["topic"]
    ).expect("metric creation failed");

    /// Envelopes rejected before delivery
    pub static ref DISPATCH_REJECTED: IntCounterVec = IntCounterVec::new(
        Opts::new("pr_dispatch_rejected_total", "Envelopes rejected before delivery"),
        &["topic", "reason"]  // malformed, stale, unauthenticated
    ).expect("metric creation failed");

    /// Handler invocations that returned an error or panicked
    pub static ref DISPATCH_HANDLER_FAILURES: IntCounterVec = IntCounterVec::new(
        Opts::new("pr_dispatch_handler_failures_total", "Failed handler invocations"),
        &["topic", "event"]
    ).expect("metric creation failed");

    // =========================================================================
    // RELAY METRICS
    // =========================================================================

    /// Relayed registrations by outcome
    pub static ref RELAY_REGISTRATIONS: IntCounterVec = IntCounterVec::new(
        Opts::new("pr_relay_registrations_total", "Relayed registration requests by outcome"),
        &["outcome"]
    ).expect("metric creation failed");

    /// Mint requests by outcome
    pub static ref RELAY_MINTS: IntCounterVec = IntCounterVec::new(
        Opts::new("pr_relay_mints_total", "Mint requests by outcome"),
        &["outcome", "source"]  // source: dispatch/http
    ).expect("metric creation failed");

    // =========================================================================
    // LEDGER METRICS
    // =========================================================================

    /// Confirmation waits that hit the timeout
    pub static ref LEDGER_CONFIRMATION_TIMEOUTS: IntCounter = IntCounter::new(
        "pr_ledger_confirmation_timeouts_total",
        "Confirmation waits that exceeded the timeout"
    ).expect("metric creation failed");

    /// Time from submission to a mined receipt
    pub static ref LEDGER_CONFIRMATION_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "pr_ledger_confirmation_duration_seconds",
            "Time spent waiting for transaction confirmation"
        ).buckets(exponential_buckets(0.05, 2.0, 12).expect("valid bucket layout"))
    ).expect("metric creation failed");
}

/// Handle to registered metrics
pub struct MetricsHandle {
    _registry: Arc<Registry>,
}

/// Register all metrics with the global registry.
///
/// Registering again is a no-op.
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        // Dispatch
        Box::new(DISPATCH_PUBLISHED.clone()),
        Box::new(DISPATCH_RECEIVED.clone()),
        Box::new(DISPATCH_DUPLICATES.clone()),
        Box::new(DISPATCH_REJECTED.clone()),
        Box::new(DISPATCH_HANDLER_FAILURES.clone()),
        // Relay
        Box::new(RELAY_REGISTRATIONS.clone()),
        Box::new(RELAY_MINTS.clone()),
        // Ledger
        Box::new(LEDGER_CONFIRMATION_TIMEOUTS.clone()),
        Box::new(LEDGER_CONFIRMATION_DURATION.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }

    Ok(MetricsHandle {
        _registry: Arc::new(REGISTRY.clone()),
    })
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}
