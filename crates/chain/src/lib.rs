//! Chain interaction layer for cross-protocol liquidation detection.
//!
//! This crate provides:
//! - Raw log and transaction views over the node's RPC types
//! - The network client capability ([`ChainReader`]) with an Alloy-backed
//!   implementation ([`ProviderManager`])
//! - The protocol processor abstraction and its concrete implementations
//!   (Aave V3, Euler V1, Euler V2, Morpho Blue)
//! - The immutable processor registry consumed by the scanner

pub mod protocol;
mod provider;
mod types;

pub use protocol::{
    AaveV3Processor, AssetAmount, AssetRef, DecodeOutcome, EnrichedLiquidationEvent,
    EnrichmentError, EulerV1Processor, EulerV2Processor, EventField, EventSignature, FieldKind,
    LiquidationEvent, MalformedEvent, MorphoProcessor, ProcessorRegistry, Protocol,
    ProtocolDetail, ProtocolProcessor, RegistryError, TransactionDecode,
};
pub use provider::{ChainReader, ClientError, ProviderManager};
pub use types::{RawLog, TransactionContext};
