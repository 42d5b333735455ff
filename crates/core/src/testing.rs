//! Test doubles shared by the scanner unit tests.

use std::collections::HashMap;
use std::time::Duration;

use alloy::primitives::{address, keccak256, Address, Bytes, B256, U256};
use alloy::rpc::types::Filter;
use alloy::sol_types::SolValue;
use async_trait::async_trait;
use smallvec::SmallVec;

use oev_chain::{ChainReader, ClientError, RawLog, TransactionContext};

const AAVE_POOL: Address = address!("87870Bca3F3fD6335C3F4ce8392D69350B4fA4E2");
const MORPHO_BLUE: Address = address!("BBBBBbbBBb9cC5e90e3b3Af64bdAF62C37EEFFCb");
const WETH: Address = address!("C02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2");
const USDC: Address = address!("A0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48");

/// In-memory [`ChainReader`] backed by fixed tables.
#[derive(Debug, Default)]
pub(crate) struct MockChainReader {
    pub txs: HashMap<B256, (TransactionContext, Vec<RawLog>)>,
    pub block_txs: HashMap<u64, Vec<B256>>,
    pub calls: HashMap<Address, Bytes>,
    pub filtered_logs: Vec<RawLog>,
    /// Artificial latency applied to every read
    pub delay: Option<Duration>,
}

impl MockChainReader {
    /// Register a transaction with its receipt logs and index it under its
    /// block.
    pub fn insert_transaction(&mut self, tx: TransactionContext, logs: Vec<RawLog>) {
        self.block_txs
            .entry(tx.block_number)
            .or_default()
            .push(tx.hash);
        self.txs.insert(tx.hash, (tx, logs));
    }

    async fn maybe_delay(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl ChainReader for MockChainReader {
    async fn get_transaction(&self, hash: B256) -> Result<TransactionContext, ClientError> {
        self.maybe_delay().await;
        self.txs
            .get(&hash)
            .map(|(tx, _)| tx.clone())
            .ok_or(ClientError::NotFound("transaction"))
    }

    async fn get_transaction_receipt(&self, hash: B256) -> Result<Vec<RawLog>, ClientError> {
        self.maybe_delay().await;
        self.txs
            .get(&hash)
            .map(|(_, logs)| logs.clone())
            .ok_or(ClientError::NotFound("receipt"))
    }

    async fn get_logs(&self, _filter: &Filter) -> Result<Vec<RawLog>, ClientError> {
        self.maybe_delay().await;
        Ok(self.filtered_logs.clone())
    }

    async fn call(&self, to: Address, _data: Bytes) -> Result<Bytes, ClientError> {
        self.maybe_delay().await;
        self.calls
            .get(&to)
            .cloned()
            .ok_or(ClientError::NotFound("contract"))
    }

    async fn block_transactions(&self, block_number: u64) -> Result<Vec<B256>, ClientError> {
        self.maybe_delay().await;
        Ok(self.block_txs.get(&block_number).cloned().unwrap_or_default())
    }
}

/// Minimal transaction context for scanner tests.
pub(crate) fn tx_context(hash: B256, block_number: u64, transaction_index: u64) -> TransactionContext {
    TransactionContext {
        hash,
        to: None,
        input: Bytes::new(),
        block_number,
        transaction_index,
    }
}

/// Conformant Aave V3 `LiquidationCall` log emitted by the mainnet pool.
pub(crate) fn aave_log(
    block_number: u64,
    tx_hash: B256,
    log_index: u64,
    liquidator: Address,
    user: Address,
) -> RawLog {
    let topic0 = keccak256("LiquidationCall(address,address,address,uint256,uint256,address,bool)");
    let data = (
        U256::from(1_000_000_000u64),
        U256::from(500_000_000_000_000_000u64),
        liquidator,
        false,
    )
        .abi_encode();
    RawLog {
        address: AAVE_POOL,
        topics: SmallVec::from_slice(&[
            topic0,
            WETH.into_word(),
            USDC.into_word(),
            user.into_word(),
        ]),
        data: data.into(),
        block_number,
        transaction_hash: tx_hash,
        log_index,
    }
}

/// Conformant Morpho Blue `Liquidate` log emitted by the singleton.
pub(crate) fn morpho_log(
    block_number: u64,
    tx_hash: B256,
    log_index: u64,
    liquidator: Address,
    user: Address,
) -> RawLog {
    let topic0 =
        keccak256("Liquidate(bytes32,address,address,uint256,uint256,uint256,uint256,uint256)");
    let data = (
        U256::from(2_000u64),
        U256::from(1_900u64),
        U256::from(2_100u64),
        U256::ZERO,
        U256::ZERO,
    )
        .abi_encode();
    RawLog {
        address: MORPHO_BLUE,
        topics: SmallVec::from_slice(&[
            topic0,
            B256::repeat_byte(0xaa),
            liquidator.into_word(),
            user.into_word(),
        ]),
        data: data.into(),
        block_number,
        transaction_hash: tx_hash,
        log_index,
    }
}
