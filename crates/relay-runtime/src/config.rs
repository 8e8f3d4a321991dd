//! # Runtime Configuration
//!
//! Built from environment variables, optionally loaded from `.env`.
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `PORT` | `3001` | HTTP port |
//! | `LEDGER_RPC_URL` / `LINEA_RPC` | unset | JSON-RPC endpoint; unset runs the in-memory ledger |
//! | `PRIVATE_KEY` | | Relay signing key, required with an RPC URL |
//! | `REGISTRY_CONTRACT_ADDRESS` | | Registry contract |
//! | `TOKEN_CONTRACT_ADDRESS` / `CONTRACT_ADDRESS` | | Token contract |
//! | `AMOUNT` | `10^18` | Default mint amount |
//! | `WAKU_REST_URL` | unset | nwaku REST API; unset uses the in-memory transport |
//! | `WAKU_CONTENT_TOPIC_MINT` | `/rln/1/mint/json` | Mint topic |
//! | `WAKU_CONTENT_TOPIC_REGISTER` | `/rln/1/register/json` | Registration topic |
//! | `DISPATCH_SIGNING_KEY` | unset | Hex HMAC key; set to sign responses |

use pr_01_onchain_gateway::GatewayConfig;
use pr_03_relay_service::RelayConfig;
use pr_04_relay_api::ApiConfig;
use shared_types::{Address, U256};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeConfigError {
    #[error("{var}: {reason}")]
    Invalid { var: &'static str, reason: String },

    #[error("{0} is required when LEDGER_RPC_URL is set")]
    Missing(&'static str),
}

/// Connection to a real ledger.
#[derive(Debug, Clone)]
pub struct LedgerSettings {
    pub rpc_url: String,
    pub private_key: String,
    pub registry_address: Option<Address>,
    pub token_address: Option<Address>,
}

#[derive(Debug, Clone, Default)]
pub struct RuntimeConfig {
    pub api: ApiConfig,
    pub relay: RelayConfig,
    pub gateway: GatewayConfig,
    /// `None` runs against the in-memory ledger.
    pub ledger: Option<LedgerSettings>,
    /// `None` runs on the in-memory transport.
    pub waku_rest_url: Option<String>,
    pub signing_key: Option<Vec<u8>>,
}

impl RuntimeConfig {
    pub fn from_env() -> Result<Self, RuntimeConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, RuntimeConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(port) = get("PORT") {
            config.api.port = port.trim().parse().map_err(|_| RuntimeConfigError::Invalid {
                var: "PORT",
                reason: format!("not a port number: {port}"),
            })?;
        }

        if let Some(amount) = get("AMOUNT") {
            config.relay.default_mint_amount =
                U256::from_dec_str(amount.trim()).map_err(|_| RuntimeConfigError::Invalid {
                    var: "AMOUNT",
                    reason: format!("not a decimal integer: {amount}"),
                })?;
        }

        if let Some(topic) = get("WAKU_CONTENT_TOPIC_MINT") {
            config.relay.mint_topic = topic;
        }
        if let Some(topic) = get("WAKU_CONTENT_TOPIC_REGISTER") {
            config.relay.registration_topic = topic;
        }
        config.waku_rest_url = get("WAKU_REST_URL");

        if let Some(key) = get("DISPATCH_SIGNING_KEY") {
            let key = hex::decode(key.trim().trim_start_matches("0x")).map_err(|e| {
                RuntimeConfigError::Invalid {
                    var: "DISPATCH_SIGNING_KEY",
                    reason: e.to_string(),
                }
            })?;
            config.signing_key = Some(key);
            config.relay.sign_responses = true;
        }

        let address = |var: &'static str, value: Option<String>| {
            value
                .map(|v| {
                    Address::parse(v.trim()).map_err(|e| RuntimeConfigError::Invalid {
                        var,
                        reason: e.to_string(),
                    })
                })
                .transpose()
        };

        if let Some(rpc_url) = get("LEDGER_RPC_URL").or_else(|| get("LINEA_RPC")) {
            let private_key = get("PRIVATE_KEY").ok_or(RuntimeConfigError::Missing("PRIVATE_KEY"))?;
            config.ledger = Some(LedgerSettings {
                rpc_url,
                private_key,
                registry_address: address(
                    "REGISTRY_CONTRACT_ADDRESS",
                    get("REGISTRY_CONTRACT_ADDRESS"),
                )?,
                token_address: address(
                    "TOKEN_CONTRACT_ADDRESS",
                    get("TOKEN_CONTRACT_ADDRESS").or_else(|| get("CONTRACT_ADDRESS")),
                )?,
            });
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_empty_environment_is_development_mode() {
        let config = RuntimeConfig::from_lookup(lookup(&[])).unwrap();
        assert!(config.ledger.is_none());
        assert!(config.waku_rest_url.is_none());
        assert_eq!(config.api.port, 3001);
        assert_eq!(config.relay.mint_topic, "/rln/1/mint/json");
        assert!(!config.relay.sign_responses);
    }

    #[test]
    fn test_legacy_variable_names() {
        let config = RuntimeConfig::from_lookup(lookup(&[
            ("LINEA_RPC", "http://localhost:8545"),
            ("PRIVATE_KEY", "0x01"),
            ("CONTRACT_ADDRESS", "0xc9dE7e861E3b7F6374EA0A12ee22e830dE4adaC3"),
            ("AMOUNT", "5000"),
            ("PORT", "4000"),
        ]))
        .unwrap();

        let ledger = config.ledger.unwrap();
        assert_eq!(ledger.rpc_url, "http://localhost:8545");
        assert!(ledger.token_address.is_some());
        assert!(ledger.registry_address.is_none());
        assert_eq!(config.relay.default_mint_amount, U256::from(5000));
        assert_eq!(config.api.port, 4000);
    }

    #[test]
    fn test_rpc_without_key_is_an_error() {
        let err = RuntimeConfig::from_lookup(lookup(&[("LEDGER_RPC_URL", "http://x")])).unwrap_err();
        assert!(matches!(err, RuntimeConfigError::Missing("PRIVATE_KEY")));
    }

    #[test]
    fn test_signing_key_enables_signed_responses() {
        let config =
            RuntimeConfig::from_lookup(lookup(&[("DISPATCH_SIGNING_KEY", "0xdeadbeef")])).unwrap();
        assert_eq!(config.signing_key, Some(vec![0xde, 0xad, 0xbe, 0xef]));
        assert!(config.relay.sign_responses);
    }

    #[test]
    fn test_bad_values_name_the_variable() {
        let err = RuntimeConfig::from_lookup(lookup(&[("PORT", "http")])).unwrap_err();
        assert!(err.to_string().starts_with("PORT:"));
        let err = RuntimeConfig::from_lookup(lookup(&[("AMOUNT", "-1")])).unwrap_err();
        assert!(err.to_string().starts_with("AMOUNT:"));
    }
}
