//! Telemetry configuration from environment variables.

use std::env;

/// Configuration for logging and metrics.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name attached to every log line
    pub service_name: String,

    /// Log level filter (trace, debug, info, warn, error or a full directive)
    pub log_level: String,

    /// Whether to enable console output
    pub console_output: bool,

    /// Whether to enable JSON formatted logs
    pub json_logs: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "personhood-relay".to_string(),
            log_level: "info".to_string(),
            console_output: true,
            json_logs: false,
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `PR_SERVICE_NAME`: Service name (default: personhood-relay)
    /// - `PR_LOG_LEVEL` or `RUST_LOG`: Log level (default: info)
    /// - `PR_CONSOLE_OUTPUT`: Enable console output (default: true)
    /// - `PR_JSON_LOGS`: Enable JSON logs (default: false in dev, true in containers)
    pub fn from_env() -> Self {
        let is_container =
            env::var("KUBERNETES_SERVICE_HOST").is_ok() || env::var("DOCKER_CONTAINER").is_ok();

        Self {
            service_name: env::var("PR_SERVICE_NAME")
                .unwrap_or_else(|_| "personhood-relay".to_string()),

            log_level: env::var("PR_LOG_LEVEL")
                .or_else(|_| env::var("RUST_LOG"))
                .unwrap_or_else(|_| "info".to_string()),

            console_output: env::var("PR_CONSOLE_OUTPUT")
                .map(|v| parse_flag(&v).unwrap_or(true))
                .unwrap_or(true),

            json_logs: env::var("PR_JSON_LOGS")
                .map(|v| parse_flag(&v).unwrap_or(false))
                .unwrap_or(is_container),
        }
    }

    /// Configuration for a named service with defaults otherwise taken from
    /// the environment.
    pub fn for_service(service_name: &str) -> Self {
        let mut config = Self::from_env();
        config.service_name = service_name.to_string();
        config
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
