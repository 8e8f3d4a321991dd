//! HTTP server configuration.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use thiserror::Error;

/// Relay API configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: IpAddr,
    /// Default: 3001. Zero binds an ephemeral port.
    pub port: u16,
    /// Allowed CORS origins. `*` allows any.
    pub allowed_origins: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 3001,
            allowed_origins: vec!["*".to_string()],
        }
    }
}

impl ApiConfig {
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.allowed_origins.is_empty() {
            return Err(ConfigError::NoOrigins);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("at least one CORS origin is required (use \"*\" for any)")]
    NoOrigins,
}
