//! Relay configuration with validation.

use shared_bus::topics;
use shared_types::U256;
use thiserror::Error;

/// Relay service configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    /// Content topic carrying `register`/`register_response`
    pub registration_topic: String,
    /// Content topic carrying `mint`/`mint_response`
    pub mint_topic: String,
    /// Amount minted when a request names none
    pub default_mint_amount: U256,
    /// Attach an HMAC signature to responses
    pub sign_responses: bool,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            registration_topic: topics::REGISTRATION.to_string(),
            mint_topic: topics::MINT.to_string(),
            // One token at 18 decimals
            default_mint_amount: U256::exp10(18),
            sign_responses: false,
        }
    }
}

impl RelayConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.registration_topic.is_empty() || self.mint_topic.is_empty() {
            return Err(ConfigError::InvalidTopic("topics cannot be empty".into()));
        }
        if self.registration_topic == self.mint_topic {
            return Err(ConfigError::InvalidTopic(
                "registration and mint topics must differ".into(),
            ));
        }
        if self.default_mint_amount.is_zero() {
            return Err(ConfigError::InvalidAmount);
        }
        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid topic: {0}")]
    InvalidTopic(String),
    #[error("default mint amount must be positive")]
    InvalidAmount,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_use_well_known_topics() {
        let config = RelayConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.registration_topic, "/rln/1/register/json");
        assert_eq!(config.mint_topic, "/rln/1/mint/json");
    }

    #[test]
    fn test_shared_topic_rejected() {
        let config = RelayConfig {
            mint_topic: topics::REGISTRATION.to_string(),
            ..RelayConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidTopic(_))));
    }
}
