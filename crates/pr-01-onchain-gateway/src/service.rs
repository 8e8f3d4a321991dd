//! # On-Chain Gateway Service
//!
//! Implements [`RegistryGateway`] and [`TokenGateway`] over a
//! [`LedgerBackend`]. Confirmation is a bounded receipt poll.

use crate::domain::config::GatewayConfig;
use crate::domain::entities::{ConfirmedRegistration, Receipt};
use crate::domain::errors::GatewayError;
use crate::ports::inbound::{RegistryGateway, TokenGateway};
use crate::ports::outbound::{LedgerBackend, LedgerError};
use async_trait::async_trait;
use registry_telemetry::metrics::{LEDGER_CONFIRMATION_DURATION, LEDGER_CONFIRMATION_TIMEOUTS};
use shared_types::{Address, IdCommitment, Identifier, ProofVerificationParams, TxHash, U256};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Gateway bound to one ledger backend (and so one signing identity).
pub struct OnChainGateway<B: LedgerBackend> {
    backend: B,
    config: GatewayConfig,
}

impl<B: LedgerBackend> OnChainGateway<B> {
    /// Create a gateway. Fails if the configuration is invalid.
    pub fn new(backend: B, config: GatewayConfig) -> Result<Self, GatewayError> {
        config.validate()?;
        Ok(Self { backend, config })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Address transactions are signed with.
    pub fn signer(&self) -> Address {
        self.backend.signer()
    }

    async fn poll_receipt(&self, tx_hash: &TxHash) -> Result<Receipt, GatewayError> {
        loop {
            match self.backend.receipt(tx_hash).await {
                Ok(Some(receipt)) => return Ok(receipt),
                Ok(None) => {}
                // RPC hiccups are retried until the confirmation deadline
                Err(LedgerError::Unavailable(reason)) => {
                    warn!(%tx_hash, %reason, "Receipt lookup failed, retrying");
                }
                Err(e) => return Err(e.into()),
            }
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }
}

#[async_trait]
impl<B: LedgerBackend> RegistryGateway for OnChainGateway<B> {
    async fn check_validity(&self, commitment: &IdCommitment) -> Result<bool, GatewayError> {
        Ok(self.backend.is_valid_id_commitment(commitment).await?)
    }

    async fn check_membership(&self, commitment: &IdCommitment) -> Result<bool, GatewayError> {
        Ok(self.backend.is_in_membership_set(commitment).await?)
    }

    async fn check_identifier(&self, identifier: &Identifier) -> Result<bool, GatewayError> {
        Ok(self.backend.check_identifier(identifier).await?)
    }

    async fn check_identifiers(
        &self,
        identifiers: &[Identifier],
    ) -> Result<Vec<bool>, GatewayError> {
        if identifiers.is_empty() {
            return Ok(Vec::new());
        }
        let flags = self.backend.check_identifiers(identifiers).await?;
        if flags.len() != identifiers.len() {
            return Err(GatewayError::Backend(format!(
                "checkIdentifiers returned {} results for {} identifiers",
                flags.len(),
                identifiers.len()
            )));
        }
        Ok(flags)
    }

    async fn register(
        &self,
        params: &ProofVerificationParams,
        commitment: &IdCommitment,
    ) -> Result<TxHash, GatewayError> {
        params.validate()?;
        let tx_hash = self
            .backend
            .submit_register(params, commitment, self.config.rate_limit)
            .await?;
        info!(%tx_hash, %commitment, signer = %self.signer(), "Registration submitted");
        Ok(tx_hash)
    }

    async fn wait_for_confirmation(&self, tx_hash: &TxHash) -> Result<Receipt, GatewayError> {
        let started = Instant::now();
        let waited = self.config.confirmation_timeout;

        let receipt = match tokio::time::timeout(waited, self.poll_receipt(tx_hash)).await {
            Ok(result) => result?,
            Err(_) => {
                LEDGER_CONFIRMATION_TIMEOUTS.inc();
                warn!(%tx_hash, ?waited, "Confirmation timed out");
                return Err(GatewayError::Timeout {
                    tx_hash: *tx_hash,
                    waited,
                });
            }
        };
        LEDGER_CONFIRMATION_DURATION.observe(started.elapsed().as_secs_f64());

        if !receipt.is_success() {
            let reason = receipt
                .revert_reason
                .clone()
                .unwrap_or_else(|| "execution reverted".to_string());
            warn!(%tx_hash, %reason, "Transaction reverted");
            return Err(GatewayError::Reverted {
                tx_hash: *tx_hash,
                reason,
            });
        }

        debug!(%tx_hash, block = receipt.block_number, "Transaction confirmed");
        Ok(receipt)
    }

    async fn register_and_confirm(
        &self,
        params: &ProofVerificationParams,
        commitment: &IdCommitment,
    ) -> Result<ConfirmedRegistration, GatewayError> {
        let identifier = params.identifier()?;
        let tx_hash = self.register(params, commitment).await?;
        let receipt = self.wait_for_confirmation(&tx_hash).await?;

        // A duplicate is mined without effect, only the log proves the binding
        if !receipt.registered(&identifier) {
            warn!(%identifier, %tx_hash, "Registration mined without binding the identifier");
            return Err(GatewayError::DuplicateIdentifier(identifier));
        }

        Ok(ConfirmedRegistration {
            identifier,
            tx_hash,
            block_number: receipt.block_number,
        })
    }

    async fn reset_identifiers(&self) -> Result<Receipt, GatewayError> {
        let tx_hash = self.backend.submit_reset().await?;
        let receipt = self.wait_for_confirmation(&tx_hash).await?;
        info!(%tx_hash, caller = %self.signer(), "Registered identifiers reset");
        Ok(receipt)
    }
}

#[async_trait]
impl<B: LedgerBackend> TokenGateway for OnChainGateway<B> {
    async fn mint(&self, to: &Address, amount: U256) -> Result<Receipt, GatewayError> {
        let tx_hash = self.backend.submit_mint(to, amount).await?;
        info!(%tx_hash, %to, %amount, "Mint submitted");
        self.wait_for_confirmation(&tx_hash).await
    }
}
