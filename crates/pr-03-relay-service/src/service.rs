//! # Relay Service
//!
//! Submits relayed requests with the relay's own identity. Every request is
//! answered: failures become `success: false` responses carrying the error
//! kind, never a crash.
//!
//! Registrations for the same identifier are serialized so that two
//! concurrent requests cannot both pass the existence check and both pay for
//! a transaction. Different identifiers proceed in parallel.

use crate::domain::config::RelayConfig;
use crate::domain::errors::RelayError;
use dashmap::DashMap;
use pr_01_onchain_gateway::{RegistryGateway, TokenGateway};
use registry_telemetry::metrics::{RELAY_MINTS, RELAY_REGISTRATIONS};
use shared_bus::{MintRequest, RegistrationRequest, RelayResponse};
use shared_types::{Address, Identifier, RegistryError, TxHash, U256};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Where a mint request came from, for metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MintSource {
    Dispatch,
    Http,
}

impl MintSource {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Dispatch => "dispatch",
            Self::Http => "http",
        }
    }
}

pub struct RelayService<G> {
    gateway: Arc<G>,
    config: RelayConfig,
    in_flight: DashMap<Identifier, Arc<Mutex<()>>>,
}

impl<G> RelayService<G>
where
    G: RegistryGateway + TokenGateway + 'static,
{
    pub fn new(gateway: Arc<G>, config: RelayConfig) -> Result<Self, RelayError> {
        config.validate()?;
        Ok(Self {
            gateway,
            config,
            in_flight: DashMap::new(),
        })
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Registrations currently holding an identifier slot.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Process one relayed registration and build its response.
    pub async fn handle_registration(&self, request: &RegistrationRequest) -> RelayResponse {
        let correlation_id = request.correlation_id;
        match self.register(request).await {
            Ok(tx_hash) => {
                RELAY_REGISTRATIONS.with_label_values(&["success"]).inc();
                info!(%correlation_id, %tx_hash, "Relayed registration confirmed");
                RelayResponse::success(correlation_id, tx_hash)
            }
            Err(e) => {
                let error: RegistryError = e.into();
                RELAY_REGISTRATIONS
                    .with_label_values(&[error.kind.as_str()])
                    .inc();
                warn!(%correlation_id, kind = %error.kind, error = %error.message, "Relayed registration failed");
                RelayResponse::failure(correlation_id, &error)
            }
        }
    }

    async fn register(&self, request: &RegistrationRequest) -> Result<TxHash, RelayError> {
        let params = &request.verification.params;
        params.validate()?;
        let identifier = params.identifier()?;

        let slot = Arc::clone(self.in_flight.entry(identifier).or_default().value());
        let result = {
            let _guard = slot.lock().await;

            // The request may be stale or redelivered
            if self.gateway.check_identifier(&identifier).await? {
                Err(RelayError::DuplicateIdentifier(identifier))
            } else {
                self.gateway
                    .register_and_confirm(params, &request.id_commitment)
                    .await
                    .map(|confirmed| confirmed.tx_hash)
                    .map_err(RelayError::from)
            }
        };

        // Map entry plus `slot`: nobody else is waiting
        self.in_flight
            .remove_if(&identifier, |_, lock| Arc::strong_count(lock) == 2);
        result
    }

    /// Process one relayed mint and build its response.
    pub async fn handle_mint(&self, request: &MintRequest) -> RelayResponse {
        let correlation_id = request.correlation_id;
        match self
            .mint(&request.recipient, request.amount, MintSource::Dispatch)
            .await
        {
            Ok(tx_hash) => RelayResponse::success(correlation_id, tx_hash),
            Err(e) => RelayResponse::failure(correlation_id, &e.into()),
        }
    }

    /// Mint `amount` (or the configured default) to `recipient`.
    pub async fn mint(
        &self,
        recipient: &Address,
        amount: Option<U256>,
        source: MintSource,
    ) -> Result<TxHash, RelayError> {
        let amount = amount.unwrap_or(self.config.default_mint_amount);
        if amount.is_zero() {
            return Err(RelayError::InvalidRequest("mint amount must be positive".into()));
        }

        match self.gateway.mint(recipient, amount).await {
            Ok(receipt) => {
                RELAY_MINTS
                    .with_label_values(&["success", source.as_str()])
                    .inc();
                info!(%recipient, %amount, tx_hash = %receipt.tx_hash, "Tokens minted");
                Ok(receipt.tx_hash)
            }
            Err(e) => {
                RELAY_MINTS
                    .with_label_values(&[e.kind().as_str(), source.as_str()])
                    .inc();
                warn!(%recipient, error = %e, "Mint failed");
                Err(e.into())
            }
        }
    }
}
