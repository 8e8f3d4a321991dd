//! # EVM JSON-RPC Backend
//!
//! Talks to deployed registry and token contracts through an HTTP provider
//! and a local signing key. Calldata is built by hand from the function
//! signature and `ethers::abi`, no generated bindings.

use crate::domain::entities::{LedgerEvent, Receipt, TxStatus};
use crate::ports::outbound::{LedgerBackend, LedgerError};
use async_trait::async_trait;
use ethers::abi::{self, ParamType, Token};
use ethers::prelude::*;
use ethers::types::transaction::eip2718::TypedTransaction;
use shared_types::{
    Address as RegistryAddress, IdCommitment, Identifier, ProofVerificationParams, TxHash,
    U256 as RegistryU256,
};
use std::sync::Arc;
use tracing::{debug, info};

const REGISTER_IDENTIFIER: &str = "registerIdentifier((bytes32,bytes,bytes32[],bytes,uint256[],uint256,string,string,bool),uint256,uint32)";
const IS_VALID_ID_COMMITMENT: &str = "isValidIdCommitment(uint256)";
const IS_IN_MEMBERSHIP_SET: &str = "isInMembershipSet(uint256)";
const CHECK_IDENTIFIER: &str = "checkIdentifier(bytes32)";
const CHECK_IDENTIFIERS: &str = "checkIdentifiers(bytes32[])";
const RESET: &str = "reset()";
const MINT: &str = "mint(address,uint256)";

const EVENT_IDENTIFIER_REGISTERED: &str = "IdentifierRegistered(bytes32,uint256)";
const EVENT_IDENTIFIERS_RESET: &str = "IdentifiersReset(address)";
const EVENT_TRANSFER: &str = "Transfer(address,address,uint256)";

/// Connection settings for [`EvmBackend`].
#[derive(Debug, Clone)]
pub struct EvmConfig {
    pub rpc_url: String,
    /// Hex signing key, `0x` optional.
    pub private_key: String,
    /// Fetched from the node when unset.
    pub chain_id: Option<u64>,
    pub registry_address: Option<RegistryAddress>,
    pub token_address: Option<RegistryAddress>,
}

type Client = SignerMiddleware<Provider<Http>, LocalWallet>;

/// [`LedgerBackend`] over an EVM JSON-RPC endpoint.
pub struct EvmBackend {
    client: Arc<Client>,
    registry: Option<H160>,
    token: Option<H160>,
    signer: RegistryAddress,
}

impl EvmBackend {
    /// Connect to the node and bind the signing key.
    pub async fn connect(config: EvmConfig) -> Result<Self, LedgerError> {
        let provider = Provider::<Http>::try_from(config.rpc_url.as_str())
            .map_err(|e| LedgerError::Unavailable(format!("invalid RPC URL: {e}")))?;

        let chain_id = match config.chain_id {
            Some(id) => id,
            None => provider
                .get_chainid()
                .await
                .map_err(|e| LedgerError::Unavailable(e.to_string()))?
                .as_u64(),
        };

        let wallet = config
            .private_key
            .trim()
            .trim_start_matches("0x")
            .parse::<LocalWallet>()
            .map_err(|e| LedgerError::Rejected(format!("invalid signing key: {e}")))?
            .with_chain_id(chain_id);
        let signer = RegistryAddress(wallet.address().0);

        info!(%signer, chain_id, rpc = %config.rpc_url, "EVM backend connected");

        Ok(Self {
            client: Arc::new(SignerMiddleware::new(provider, wallet)),
            registry: config.registry_address.map(|a| H160(a.0)),
            token: config.token_address.map(|a| H160(a.0)),
            signer,
        })
    }

    fn registry(&self) -> Result<H160, LedgerError> {
        self.registry
            .ok_or_else(|| LedgerError::Rejected("registry contract address not configured".into()))
    }

    fn token(&self) -> Result<H160, LedgerError> {
        self.token
            .ok_or_else(|| LedgerError::Rejected("token contract address not configured".into()))
    }

    async fn call(&self, to: H160, data: Vec<u8>) -> Result<Bytes, LedgerError> {
        let tx: TypedTransaction = TransactionRequest::new().to(to).data(Bytes::from(data)).into();
        self.client
            .call(&tx, None)
            .await
            .map_err(|e| LedgerError::Unavailable(e.to_string()))
    }

    async fn send(&self, to: H160, data: Vec<u8>) -> Result<TxHash, LedgerError> {
        let tx = TransactionRequest::new().to(to).data(Bytes::from(data));
        let pending_tx = self
            .client
            .send_transaction(tx, None)
            .await
            .map_err(|e| LedgerError::Rejected(e.to_string()))?;
        let tx_hash = pending_tx.tx_hash();
        debug!(?tx_hash, ?to, "Transaction sent");
        Ok(TxHash(tx_hash.0))
    }

    async fn call_bool(&self, to: H160, data: Vec<u8>) -> Result<bool, LedgerError> {
        let output = self.call(to, data).await?;
        abi::decode(&[ParamType::Bool], &output)
            .map_err(|e| LedgerError::Decode(e.to_string()))?
            .into_iter()
            .next()
            .and_then(Token::into_bool)
            .ok_or_else(|| LedgerError::Decode("expected bool".into()))
    }
}

fn calldata(signature: &str, tokens: &[Token]) -> Vec<u8> {
    let mut data = ethers::utils::keccak256(signature)[..4].to_vec();
    data.extend_from_slice(&abi::encode(tokens));
    data
}

fn uint(value: RegistryU256) -> Token {
    let mut bytes = [0u8; 32];
    value.to_big_endian(&mut bytes);
    Token::Uint(U256::from_big_endian(&bytes))
}

fn commitment_token(commitment: &IdCommitment) -> Token {
    Token::Uint(U256::from_big_endian(&commitment.to_be_bytes()))
}

fn params_token(params: &ProofVerificationParams) -> Token {
    Token::Tuple(vec![
        Token::FixedBytes(params.vkey_hash.to_vec()),
        Token::Bytes(params.proof.clone()),
        Token::Array(
            params
                .public_inputs
                .iter()
                .map(|word| Token::FixedBytes(word.to_vec()))
                .collect(),
        ),
        Token::Bytes(params.committed_inputs.clone()),
        Token::Array(
            params
                .committed_input_counts
                .iter()
                .map(|count| Token::Uint(U256::from(*count)))
                .collect(),
        ),
        Token::Uint(U256::from(params.validity_period_in_seconds)),
        Token::String(params.domain.clone()),
        Token::String(params.scope.clone()),
        Token::Bool(params.dev_mode),
    ])
}

fn topic(signature: &str) -> H256 {
    H256(ethers::utils::keccak256(signature))
}

fn decode_log(log: &Log) -> Option<LedgerEvent> {
    let first = *log.topics.first()?;
    if first == topic(EVENT_IDENTIFIER_REGISTERED) {
        // identifier indexed, commitment in data
        let identifier = Identifier(log.topics.get(1)?.0);
        let commitment = abi::decode(&[ParamType::Uint(256)], &log.data)
            .ok()?
            .into_iter()
            .next()?
            .into_uint()?;
        let mut bytes = [0u8; 32];
        commitment.to_big_endian(&mut bytes);
        Some(LedgerEvent::IdentifierRegistered {
            identifier,
            id_commitment: IdCommitment::from(RegistryU256::from_big_endian(&bytes)),
        })
    } else if first == topic(EVENT_IDENTIFIERS_RESET) {
        let caller = abi::decode(&[ParamType::Address], &log.data)
            .ok()?
            .into_iter()
            .next()?
            .into_address()?;
        Some(LedgerEvent::IdentifiersReset {
            caller: RegistryAddress(caller.0),
        })
    } else if first == topic(EVENT_TRANSFER) && log.topics.len() == 3 {
        // Mints are transfers from the zero address
        if log.topics[1] != H256::zero() {
            return None;
        }
        let to = H160::from(log.topics[2]);
        let amount = abi::decode(&[ParamType::Uint(256)], &log.data)
            .ok()?
            .into_iter()
            .next()?
            .into_uint()?;
        let mut bytes = [0u8; 32];
        amount.to_big_endian(&mut bytes);
        Some(LedgerEvent::Minted {
            to: RegistryAddress(to.0),
            amount: RegistryU256::from_big_endian(&bytes),
        })
    } else {
        None
    }
}

#[async_trait]
impl LedgerBackend for EvmBackend {
    async fn is_valid_id_commitment(&self, commitment: &IdCommitment) -> Result<bool, LedgerError> {
        let data = calldata(IS_VALID_ID_COMMITMENT, &[commitment_token(commitment)]);
        self.call_bool(self.registry()?, data).await
    }

    async fn is_in_membership_set(&self, commitment: &IdCommitment) -> Result<bool, LedgerError> {
        let data = calldata(IS_IN_MEMBERSHIP_SET, &[commitment_token(commitment)]);
        self.call_bool(self.registry()?, data).await
    }

    async fn check_identifier(&self, identifier: &Identifier) -> Result<bool, LedgerError> {
        let data = calldata(CHECK_IDENTIFIER, &[Token::FixedBytes(identifier.0.to_vec())]);
        self.call_bool(self.registry()?, data).await
    }

    async fn check_identifiers(&self, identifiers: &[Identifier]) -> Result<Vec<bool>, LedgerError> {
        let words = identifiers
            .iter()
            .map(|id| Token::FixedBytes(id.0.to_vec()))
            .collect();
        let data = calldata(CHECK_IDENTIFIERS, &[Token::Array(words)]);
        let output = self.call(self.registry()?, data).await?;

        let array = abi::decode(&[ParamType::Array(Box::new(ParamType::Bool))], &output)
            .map_err(|e| LedgerError::Decode(e.to_string()))?
            .into_iter()
            .next()
            .and_then(Token::into_array)
            .ok_or_else(|| LedgerError::Decode("expected bool[]".into()))?;
        array
            .into_iter()
            .map(|t| {
                t.into_bool()
                    .ok_or_else(|| LedgerError::Decode("expected bool".into()))
            })
            .collect()
    }

    async fn submit_register(
        &self,
        params: &ProofVerificationParams,
        commitment: &IdCommitment,
        rate_limit: u32,
    ) -> Result<TxHash, LedgerError> {
        let data = calldata(
            REGISTER_IDENTIFIER,
            &[
                params_token(params),
                commitment_token(commitment),
                Token::Uint(U256::from(rate_limit)),
            ],
        );
        self.send(self.registry()?, data).await
    }

    async fn submit_mint(
        &self,
        to: &RegistryAddress,
        amount: RegistryU256,
    ) -> Result<TxHash, LedgerError> {
        let data = calldata(MINT, &[Token::Address(H160(to.0)), uint(amount)]);
        self.send(self.token()?, data).await
    }

    async fn submit_reset(&self) -> Result<TxHash, LedgerError> {
        self.send(self.registry()?, calldata(RESET, &[])).await
    }

    async fn receipt(&self, tx_hash: &TxHash) -> Result<Option<Receipt>, LedgerError> {
        let receipt = self
            .client
            .get_transaction_receipt(H256(tx_hash.0))
            .await
            .map_err(|e| LedgerError::Unavailable(e.to_string()))?;
        let Some(receipt) = receipt else {
            return Ok(None);
        };

        let status = if receipt.status == Some(U64::from(1)) {
            TxStatus::Success
        } else {
            TxStatus::Reverted
        };
        Ok(Some(Receipt {
            tx_hash: *tx_hash,
            block_number: receipt.block_number.map(|b| b.as_u64()).unwrap_or_default(),
            status,
            events: receipt.logs.iter().filter_map(decode_log).collect(),
            revert_reason: None,
        }))
    }

    fn signer(&self) -> RegistryAddress {
        self.signer
    }
}
