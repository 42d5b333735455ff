//! Chain data types consumed by the protocol processors.
//!
//! These are thin, owned views over the node's RPC types: the processors
//! never hold on to provider responses beyond a single decode call.

use alloy::consensus::Transaction as _;
use alloy::primitives::{Address, Bytes, B256};
use alloy::rpc::types::{Log, Transaction};
use smallvec::SmallVec;

/// Raw event log as fetched from a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLog {
    /// Contract that emitted the log
    pub address: Address,
    /// Ordered topics; topic0 is the event signature hash
    pub topics: SmallVec<[B256; 4]>,
    /// Non-indexed payload
    pub data: Bytes,
    /// Block the log was included in
    pub block_number: u64,
    /// Transaction that emitted the log
    pub transaction_hash: B256,
    /// Log index within the block
    pub log_index: u64,
}

impl RawLog {
    /// The event signature topic, if the log has any topics at all.
    pub fn topic0(&self) -> Option<&B256> {
        self.topics.first()
    }
}

impl From<&Log> for RawLog {
    fn from(log: &Log) -> Self {
        Self {
            address: log.address(),
            topics: SmallVec::from_slice(log.topics()),
            data: log.data().data.clone(),
            block_number: log.block_number.unwrap_or_default(),
            transaction_hash: log.transaction_hash.unwrap_or_default(),
            log_index: log.log_index.unwrap_or_default(),
        }
    }
}

/// Transaction fields the matchers and scanner care about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionContext {
    /// Transaction hash
    pub hash: B256,
    /// Target address (None for contract creation)
    pub to: Option<Address>,
    /// Calldata
    pub input: Bytes,
    /// Block the transaction was included in
    pub block_number: u64,
    /// Position within the block
    pub transaction_index: u64,
}

impl From<&Transaction> for TransactionContext {
    fn from(tx: &Transaction) -> Self {
        Self {
            hash: *tx.inner.tx_hash(),
            to: tx.inner.to(),
            input: tx.inner.input().clone(),
            block_number: tx.block_number.unwrap_or_default(),
            transaction_index: tx.transaction_index.unwrap_or_default(),
        }
    }
}
