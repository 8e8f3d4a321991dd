//! Gateway configuration with validation.

use std::time::Duration;
use thiserror::Error;

/// On-chain gateway configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    /// `rateLimit` argument passed to `registerIdentifier`
    pub rate_limit: u32,
    /// Upper bound on a confirmation wait
    pub confirmation_timeout: Duration,
    /// Interval between receipt polls
    pub poll_interval: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            rate_limit: 100,
            confirmation_timeout: Duration::from_secs(120),
            poll_interval: Duration::from_secs(1),
        }
    }
}

impl GatewayConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rate_limit == 0 {
            return Err(ConfigError::InvalidRateLimit("rate_limit cannot be 0".into()));
        }
        if self.confirmation_timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout(
                "confirmation_timeout cannot be 0".into(),
            ));
        }
        if self.poll_interval.is_zero() || self.poll_interval > self.confirmation_timeout {
            return Err(ConfigError::InvalidTimeout(
                "poll_interval must be non-zero and within confirmation_timeout".into(),
            ));
        }
        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Invalid rate limit
    #[error("invalid rate limit: {0}")]
    InvalidRateLimit(String),
    /// Invalid timeout value
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),
}
