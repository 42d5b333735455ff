//! Protocol abstraction layer for multi-protocol liquidation detection.
//!
//! This module provides the capability set that lets heterogeneous lending
//! protocols (Aave V3, Euler V1/V2, Morpho Blue) share one detection,
//! decoding and enrichment pipeline.
//!
//! # Architecture
//!
//! Each protocol variant implements [`ProtocolProcessor`], which composes
//! three concerns behind one contract:
//!
//! - **Matching**: is this transaction's log set a liquidation for the
//!   protocol? A pure predicate over topic hashes and emitter addresses.
//! - **Decoding**: turn one raw log into a typed [`LiquidationEvent`], with
//!   an explicit [`DecodeOutcome`] instead of control flow by exception.
//! - **Enrichment**: attach protocol context (market parameters, resolved
//!   vault assets, health metrics) through idempotent [`ChainReader`] calls.
//!
//! Processors are stateless apart from their static signature tables; one
//! instance is built at startup and reused across all scans.
//!
//! # Example
//!
//! ```rust,ignore
//! use oev_chain::protocol::{AaveV3Processor, DecodeOutcome, ProtocolProcessor};
//!
//! let processor = AaveV3Processor::new();
//! if processor.is_liquidation_transaction(&tx, &logs) {
//!     for log in &logs {
//!         if let DecodeOutcome::Event(event) = processor.decode_liquidation(log) {
//!             let enriched = processor.enrich_event(&event, &client).await?;
//!             // report...
//!         }
//!     }
//! }
//! ```

mod aave_v3;
mod euler_v1;
mod euler_v2;
mod events;
mod morpho;
mod registry;

pub use aave_v3::AaveV3Processor;
pub use euler_v1::EulerV1Processor;
pub use euler_v2::EulerV2Processor;
pub use events::{EventField, EventSignature, FieldKind};
pub use morpho::MorphoProcessor;
pub use registry::{ProcessorRegistry, RegistryError};

use std::collections::BTreeMap;
use std::fmt;

use alloy::primitives::{Address, B256, U256};
use alloy::sol_types::SolEvent;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::provider::{ChainReader, ClientError};
use crate::types::{RawLog, TransactionContext};

/// Protocol identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    /// Aave V3 mainnet pool
    AaveV3,
    /// Euler V1 monolith
    EulerV1,
    /// Euler V2 vault kit
    EulerV2,
    /// Morpho Blue singleton
    Morpho,
}

impl Protocol {
    /// Canonical name used for grouping and fixtures.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AaveV3 => "aave_v3",
            Self::EulerV1 => "euler_v1",
            Self::EulerV2 => "euler_v2",
            Self::Morpho => "morpho",
        }
    }

    /// Parse from string (e.g. from config).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "aave-v3" | "aavev3" | "aave_v3" => Some(Self::AaveV3),
            "euler-v1" | "eulerv1" | "euler_v1" | "euler" => Some(Self::EulerV1),
            "euler-v2" | "eulerv2" | "euler_v2" => Some(Self::EulerV2),
            "morpho" | "morpho-blue" | "morpho_blue" => Some(Self::Morpho),
            _ => None,
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a protocol denominates liquidation amounts in.
///
/// Aave settles in ERC-20 tokens, Euler V2 in vault shares, Morpho Blue in
/// market-scoped asset units identified by the market id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetRef {
    Token(Address),
    Vault(Address),
    Market(B256),
}

/// An amount denominated in a protocol asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetAmount {
    pub asset: AssetRef,
    pub amount: U256,
}

/// Protocol-specific fields decoded from the same log as the core record.
///
/// Carried on [`LiquidationEvent`] so pure enrichment analytics never need
/// to re-decode the raw payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtocolDetail {
    AaveV3 {
        receive_atoken: bool,
    },
    EulerV1 {
        health_score: U256,
        base_discount: U256,
        discount: U256,
    },
    EulerV2 {
        yield_balance: U256,
        discount: U256,
    },
    Morpho {
        repaid_shares: U256,
        bad_debt_assets: U256,
        bad_debt_shares: U256,
    },
}

/// A decoded liquidation.
///
/// Every field is populated after a successful decode; partial records are
/// never exposed. `sub_event_index` is set only for batched liquidations,
/// where several sub-events settle within one transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidationEvent {
    pub protocol: Protocol,
    pub transaction_hash: B256,
    pub block_number: u64,
    /// Account that performed the liquidation
    pub liquidator: Address,
    /// Account whose position was liquidated
    pub user: Address,
    pub debt_repaid: AssetAmount,
    pub collateral_seized: AssetAmount,
    /// Position within a batched liquidation, if any
    pub sub_event_index: Option<u32>,
    /// Index of the source log within its block
    pub log_index: u64,
    pub detail: ProtocolDetail,
}

/// A liquidation with protocol context attached.
///
/// Enrichment only inserts context keys; the decoded core is embedded
/// unmodified, and re-running enrichment against the same chain state yields
/// the same map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedLiquidationEvent {
    #[serde(flatten)]
    pub event: LiquidationEvent,
    pub context: BTreeMap<String, serde_json::Value>,
}

impl EnrichedLiquidationEvent {
    /// Wrap a decoded event with no context (enrichment skipped or failed).
    pub fn unenriched(event: LiquidationEvent) -> Self {
        Self {
            event,
            context: BTreeMap::new(),
        }
    }

    /// Insert one context entry.
    pub fn insert(&mut self, key: &str, value: serde_json::Value) {
        self.context.insert(key.to_string(), value);
    }
}

/// Signature matched but the payload is structurally invalid.
///
/// Indicates a chain-data anomaly or a decoder bug; surfaced to the caller,
/// never silently swallowed.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{protocol} log {log_index}: {reason}")]
pub struct MalformedEvent {
    pub protocol: Protocol,
    pub log_index: u64,
    pub reason: String,
}

/// An enrichment read failed.
///
/// Callers keep the unenriched record rather than discard the liquidation.
#[derive(Debug, Error)]
pub enum EnrichmentError {
    /// The underlying client call failed
    #[error("enrichment read failed: {0}")]
    Read(#[from] ClientError),
    /// The read succeeded but the response was unusable
    #[error("enrichment data unavailable: {0}")]
    Unavailable(String),
}

/// Outcome of attempting to decode a single log.
#[derive(Debug, Clone)]
pub enum DecodeOutcome {
    /// topic0 matched and the payload decoded cleanly
    Event(LiquidationEvent),
    /// Batch container log; the sub-events are carried by sibling logs
    BatchHeader { liquidator: Address, count: u64 },
    /// topic0 does not belong to this protocol's liquidation events
    NotThisEvent,
    /// topic0 matched but the payload did not conform
    Malformed(MalformedEvent),
}

/// Result of decoding every log of one transaction for one protocol.
#[derive(Debug, Clone, Default)]
pub struct TransactionDecode {
    /// Decoded events in ascending log-index order
    pub events: Vec<LiquidationEvent>,
    /// Malformed logs encountered along the way; one bad log never
    /// suppresses its siblings
    pub errors: Vec<MalformedEvent>,
}

/// Capability set of one protocol version: matcher, decoder, enricher.
///
/// Implementations are stateless (or hold only static signature tables),
/// constructed once at startup and shared across scans. Adding a protocol
/// means implementing this trait and registering the variant; the scanner
/// is untouched.
#[async_trait]
pub trait ProtocolProcessor: Send + Sync + fmt::Debug {
    /// Protocol identity, used for result grouping and error attribution.
    fn protocol(&self) -> Protocol;

    /// Exhaustive signature table for this protocol version.
    fn signatures(&self) -> &[EventSignature];

    /// Contract set the liquidation events are emitted from, or `None` when
    /// the emitter set is permissionless (e.g. Euler V2 vaults).
    fn emitters(&self) -> Option<&[Address]>;

    /// Decode one raw log.
    fn decode_liquidation(&self, log: &RawLog) -> DecodeOutcome;

    /// Attach protocol context to a decoded event.
    ///
    /// Reads are idempotent queries against static or slowly-changing chain
    /// state; decoded core fields are never altered.
    async fn enrich_event(
        &self,
        event: &LiquidationEvent,
        client: &dyn ChainReader,
    ) -> Result<EnrichedLiquidationEvent, EnrichmentError>;

    /// Whether a single log belongs to this protocol's liquidation events.
    fn matches_log(&self, log: &RawLog) -> bool {
        let Some(topic0) = log.topic0() else {
            return false;
        };
        if !self.signatures().iter().any(|sig| sig.topic == *topic0) {
            return false;
        }
        match self.emitters() {
            Some(set) => set.contains(&log.address),
            None => true,
        }
    }

    /// Whether the transaction contains at least one liquidation for this
    /// protocol. Pure predicate: malformed or unrelated logs are
    /// non-matches, never errors.
    fn is_liquidation_transaction(&self, _tx: &TransactionContext, logs: &[RawLog]) -> bool {
        logs.iter().any(|log| self.matches_log(log))
    }

    /// Decode every liquidation in a transaction's log set.
    ///
    /// Runs [`decode_liquidation`](Self::decode_liquidation) over the logs
    /// in order, collecting events and malformed errors independently. If
    /// the transaction carries a batch container (or more than one event
    /// for this protocol), each event is stamped with a `sub_event_index`
    /// in log order; a container whose declared count disagrees with the
    /// decoded sub-events records a [`MalformedEvent`] for the container
    /// log while the sub-events survive.
    fn decode_transaction(&self, logs: &[RawLog]) -> TransactionDecode {
        let mut decoded = TransactionDecode::default();
        let mut header: Option<(u64, u64)> = None;

        for log in logs {
            match self.decode_liquidation(log) {
                DecodeOutcome::Event(event) => decoded.events.push(event),
                DecodeOutcome::BatchHeader { count, .. } => {
                    header = Some((log.log_index, count));
                }
                DecodeOutcome::NotThisEvent => {}
                DecodeOutcome::Malformed(err) => decoded.errors.push(err),
            }
        }

        if header.is_some() || decoded.events.len() > 1 {
            for (i, event) in decoded.events.iter_mut().enumerate() {
                event.sub_event_index = Some(i as u32);
            }
        }

        if let Some((log_index, count)) = header {
            if count != decoded.events.len() as u64 {
                decoded.errors.push(MalformedEvent {
                    protocol: self.protocol(),
                    log_index,
                    reason: format!(
                        "batch container declares {count} liquidations, decoded {}",
                        decoded.events.len()
                    ),
                });
            }
        }

        decoded
    }
}

/// Decode a matched log into a typed sol! event, mapping ABI errors to
/// [`MalformedEvent`]. Callers have already checked topic0.
pub(crate) fn decode_event<E: SolEvent>(
    protocol: Protocol,
    log: &RawLog,
) -> Result<E, MalformedEvent> {
    E::decode_raw_log(log.topics.iter().copied(), &log.data, true).map_err(|e| MalformedEvent {
        protocol,
        log_index: log.log_index,
        reason: e.to_string(),
    })
}

/// Scale a 1e18-fixed-point chain value to a float for context fields.
pub(crate) fn wad_to_f64(value: U256) -> f64 {
    value.saturating_to::<u128>() as f64 / 1e18
}
