//! # Registry Telemetry
//!
//! Observability for the personhood registry services.
//!
//! ## Components
//!
//! - **Logs**: `tracing` with an `EnvFilter`, pretty or JSON formatted
//! - **Metrics**: Prometheus counters exposed by the relay at `GET /metrics`
//!
//! ## Usage
//!
//! ```rust,ignore
//! use registry_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     let _guard = init_telemetry(TelemetryConfig::from_env())?;
//!     // Logs and metrics are now being collected
//!     Ok(())
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `PR_LOG_LEVEL` / `RUST_LOG` | `info` | Log level filter |
//! | `PR_JSON_LOGS` | `false` (`true` in containers) | JSON formatted logs |
//! | `PR_SERVICE_NAME` | `personhood-relay` | Service name attached to logs |

mod config;
mod logging;
pub mod metrics;

pub use config::TelemetryConfig;
pub use logging::init_logging;
pub use metrics::{encode_metrics, register_metrics, MetricsHandle};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize log subscriber: {0}")]
    LoggingInit(String),

    #[error("Telemetry already initialized")]
    AlreadyInitialized,

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Initialize logging and register metrics.
///
/// Returns a guard to hold for the lifetime of the process. A second call in
/// the same process fails with [`TelemetryError::AlreadyInitialized`].
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    // Metrics first, logging can only be installed once per process
    let metrics = register_metrics()?;
    init_logging(&config)?;

    tracing::info!(
        service = %config.service_name,
        json_logs = config.json_logs,
        "Telemetry initialized"
    );

    Ok(TelemetryGuard { _metrics: metrics })
}

/// Guard that keeps telemetry active.
pub struct TelemetryGuard {
    _metrics: MetricsHandle,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!("Shutting down telemetry...");
    }
}

/// Convenience macro for recording a metric increment.
#[macro_export]
macro_rules! metric_inc {
    ($metric:expr) => {
        $metric.inc()
    };
    ($metric:expr, $labels:expr) => {
        $metric.with_label_values($labels).inc()
    };
}
