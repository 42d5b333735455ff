//! Network client capability consumed by the processors and scanner.
//! Uses Alloy providers for type-safe RPC interactions.

use std::time::Duration;

use alloy::consensus::TxReceipt as _;
use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes, B256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::{Filter, TransactionRequest};
use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info};

use crate::types::{RawLog, TransactionContext};

/// Errors surfaced by the network client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport-level failure (connection, RPC, serialization)
    #[error("transport error: {0}")]
    Transport(String),
    /// The read did not complete within the caller's deadline
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    /// The node answered but the requested entity does not exist
    #[error("{0} not found")]
    NotFound(&'static str),
}

impl From<alloy::transports::TransportError> for ClientError {
    fn from(err: alloy::transports::TransportError) -> Self {
        Self::Transport(err.to_string())
    }
}

/// Read-only chain access used by enrichment and the scanner.
///
/// Implementations own connection handling and transport retries; callers
/// treat every method as an idempotent query and never cache results.
#[async_trait]
pub trait ChainReader: Send + Sync {
    /// Fetch a transaction by hash.
    async fn get_transaction(&self, hash: B256) -> Result<TransactionContext, ClientError>;

    /// Fetch the ordered logs of a transaction's receipt.
    async fn get_transaction_receipt(&self, hash: B256) -> Result<Vec<RawLog>, ClientError>;

    /// Fetch logs matching a filter.
    async fn get_logs(&self, filter: &Filter) -> Result<Vec<RawLog>, ClientError>;

    /// Perform an `eth_call` against a contract at the latest block.
    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, ClientError>;

    /// Fetch the ordered transaction hashes of a block.
    async fn block_transactions(&self, block_number: u64) -> Result<Vec<B256>, ClientError>;
}

/// Alloy-backed [`ChainReader`] over a single HTTP endpoint.
///
/// Providers are built per call from the stored URL; alloy's HTTP transport
/// pools connections underneath, so this keeps the manager trivially
/// cloneable without holding generic provider types.
#[derive(Debug, Clone)]
pub struct ProviderManager {
    http_url: String,
}

impl ProviderManager {
    /// Create a new provider manager and verify the endpoint responds.
    pub async fn new(http_url: &str) -> Result<Self, ClientError> {
        let manager = Self {
            http_url: http_url.to_string(),
        };

        let provider = manager.provider()?;
        let block = provider.get_block_number().await?;
        info!(url = http_url, block, "Provider connection verified");

        Ok(manager)
    }

    /// Get the HTTP URL.
    pub fn http_url(&self) -> &str {
        &self.http_url
    }

    fn provider(&self) -> Result<impl Provider, ClientError> {
        let url = self
            .http_url
            .parse()
            .map_err(|e| ClientError::Transport(format!("invalid RPC URL: {e}")))?;
        Ok(ProviderBuilder::new().on_http(url))
    }
}

#[async_trait]
impl ChainReader for ProviderManager {
    async fn get_transaction(&self, hash: B256) -> Result<TransactionContext, ClientError> {
        let tx = self
            .provider()?
            .get_transaction_by_hash(hash)
            .await?
            .ok_or(ClientError::NotFound("transaction"))?;
        Ok(TransactionContext::from(&tx))
    }

    async fn get_transaction_receipt(&self, hash: B256) -> Result<Vec<RawLog>, ClientError> {
        let receipt = self
            .provider()?
            .get_transaction_receipt(hash)
            .await?
            .ok_or(ClientError::NotFound("receipt"))?;
        Ok(receipt.inner.logs().iter().map(RawLog::from).collect())
    }

    async fn get_logs(&self, filter: &Filter) -> Result<Vec<RawLog>, ClientError> {
        let logs = self.provider()?.get_logs(filter).await?;
        debug!(count = logs.len(), "Fetched logs");
        Ok(logs.iter().map(RawLog::from).collect())
    }

    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, ClientError> {
        let request = TransactionRequest::default()
            .with_to(to)
            .with_input(data);
        Ok(self.provider()?.call(request).await?)
    }

    async fn block_transactions(&self, block_number: u64) -> Result<Vec<B256>, ClientError> {
        let block = self
            .provider()?
            .get_block_by_number(block_number.into())
            .await?
            .ok_or(ClientError::NotFound("block"))?;
        Ok(block.transactions.hashes().collect())
    }
}
