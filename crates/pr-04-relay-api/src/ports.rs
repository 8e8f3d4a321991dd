//! The one capability the HTTP surface needs from the relay.

use async_trait::async_trait;
use pr_01_onchain_gateway::{RegistryGateway, TokenGateway};
use pr_03_relay_service::{MintSource, RelayService};
use shared_types::{Address, RegistryError, TxHash, U256};

#[async_trait]
pub trait Minter: Send + Sync {
    /// Mint `amount` (or the relay's default) to `recipient` and wait for
    /// confirmation.
    async fn mint(&self, recipient: &Address, amount: Option<U256>) -> Result<TxHash, RegistryError>;
}

#[async_trait]
impl<G> Minter for RelayService<G>
where
    G: RegistryGateway + TokenGateway + 'static,
{
    async fn mint(&self, recipient: &Address, amount: Option<U256>) -> Result<TxHash, RegistryError> {
        RelayService::mint(self, recipient, amount, MintSource::Http)
            .await
            .map_err(RegistryError::from)
    }
}
