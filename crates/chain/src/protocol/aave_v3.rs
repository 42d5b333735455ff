//! Aave V3 liquidation processor (Ethereum mainnet pool).
//!
//! Aave V3 settles each liquidation in a single `LiquidationCall` event
//! emitted by the pool contract. Enrichment reads the collateral reserve's
//! configuration (threshold, bonus) from the protocol data provider.

use alloy::primitives::{address, Address};
use alloy::sol;
use alloy::sol_types::{SolCall, SolEvent};
use async_trait::async_trait;
use serde_json::json;

use super::{
    decode_event, AssetAmount, AssetRef, DecodeOutcome, EnrichedLiquidationEvent, EnrichmentError,
    EventField, EventSignature, FieldKind, LiquidationEvent, Protocol, ProtocolDetail,
    ProtocolProcessor,
};
use crate::provider::ChainReader;
use crate::types::RawLog;

sol! {
    /// Pool event emitted once per liquidation call.
    event LiquidationCall(
        address indexed collateralAsset,
        address indexed debtAsset,
        address indexed user,
        uint256 debtToCover,
        uint256 liquidatedCollateralAmount,
        address liquidator,
        bool receiveAToken
    );

    /// Protocol data provider read used for enrichment.
    interface IPoolDataProvider {
        function getReserveConfigurationData(address asset)
            external
            view
            returns (
                uint256 decimals,
                uint256 ltv,
                uint256 liquidationThreshold,
                uint256 liquidationBonus,
                uint256 reserveFactor,
                bool usageAsCollateralEnabled,
                bool borrowingEnabled,
                bool stableBorrowRateEnabled,
                bool isActive,
                bool isFrozen
            );
    }
}

/// Aave V3 Pool (Ethereum mainnet).
pub const POOL: Address = address!("87870Bca3F3fD6335C3F4ce8392D69350B4fA4E2");

/// Aave V3 protocol data provider, source of reserve configuration reads.
pub const POOL_DATA_PROVIDER: Address = address!("7B4EB56E7CD4b454BA8ff71E4518426369a138a3");

const LIQUIDATION_CALL_FIELDS: &[EventField] = &[
    EventField {
        name: "collateralAsset",
        kind: FieldKind::Address,
        indexed: true,
    },
    EventField {
        name: "debtAsset",
        kind: FieldKind::Address,
        indexed: true,
    },
    EventField {
        name: "user",
        kind: FieldKind::Address,
        indexed: true,
    },
    EventField {
        name: "debtToCover",
        kind: FieldKind::Uint256,
        indexed: false,
    },
    EventField {
        name: "liquidatedCollateralAmount",
        kind: FieldKind::Uint256,
        indexed: false,
    },
    EventField {
        name: "liquidator",
        kind: FieldKind::Address,
        indexed: false,
    },
    EventField {
        name: "receiveAToken",
        kind: FieldKind::Bool,
        indexed: false,
    },
];

/// Aave V3 protocol processor.
#[derive(Debug)]
pub struct AaveV3Processor {
    signatures: [EventSignature; 1],
    emitters: [Address; 1],
}

impl AaveV3Processor {
    pub fn new() -> Self {
        Self {
            signatures: [EventSignature::new(
                Protocol::AaveV3,
                "LiquidationCall",
                LiquidationCall::SIGNATURE,
                LIQUIDATION_CALL_FIELDS,
            )],
            emitters: [POOL],
        }
    }
}

impl Default for AaveV3Processor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProtocolProcessor for AaveV3Processor {
    fn protocol(&self) -> Protocol {
        Protocol::AaveV3
    }

    fn signatures(&self) -> &[EventSignature] {
        &self.signatures
    }

    fn emitters(&self) -> Option<&[Address]> {
        Some(&self.emitters)
    }

    fn decode_liquidation(&self, log: &RawLog) -> DecodeOutcome {
        match log.topic0() {
            Some(topic) if *topic == LiquidationCall::SIGNATURE_HASH => {}
            _ => return DecodeOutcome::NotThisEvent,
        }

        let ev = match decode_event::<LiquidationCall>(Protocol::AaveV3, log) {
            Ok(ev) => ev,
            Err(err) => return DecodeOutcome::Malformed(err),
        };

        DecodeOutcome::Event(LiquidationEvent {
            protocol: Protocol::AaveV3,
            transaction_hash: log.transaction_hash,
            block_number: log.block_number,
            liquidator: ev.liquidator,
            user: ev.user,
            debt_repaid: AssetAmount {
                asset: AssetRef::Token(ev.debtAsset),
                amount: ev.debtToCover,
            },
            collateral_seized: AssetAmount {
                asset: AssetRef::Token(ev.collateralAsset),
                amount: ev.liquidatedCollateralAmount,
            },
            sub_event_index: None,
            log_index: log.log_index,
            detail: ProtocolDetail::AaveV3 {
                receive_atoken: ev.receiveAToken,
            },
        })
    }

    async fn enrich_event(
        &self,
        event: &LiquidationEvent,
        client: &dyn ChainReader,
    ) -> Result<EnrichedLiquidationEvent, EnrichmentError> {
        let AssetRef::Token(collateral) = event.collateral_seized.asset else {
            return Err(EnrichmentError::Unavailable(
                "collateral is not an ERC-20 reserve".to_string(),
            ));
        };

        let calldata =
            IPoolDataProvider::getReserveConfigurationDataCall { asset: collateral }.abi_encode();
        let ret = client.call(POOL_DATA_PROVIDER, calldata.into()).await?;
        let config = IPoolDataProvider::getReserveConfigurationDataCall::abi_decode_returns(
            &ret, true,
        )
        .map_err(|e| EnrichmentError::Unavailable(format!("reserve configuration: {e}")))?;

        let mut enriched = EnrichedLiquidationEvent::unenriched(event.clone());
        enriched.insert(
            "liquidation_threshold_bps",
            json!(config.liquidationThreshold.saturating_to::<u64>()),
        );
        enriched.insert(
            "liquidation_bonus_bps",
            json!(config.liquidationBonus.saturating_to::<u64>()),
        );
        enriched.insert("reserve_active", json!(config.isActive));

        let method = match event.detail {
            ProtocolDetail::AaveV3 {
                receive_atoken: true,
            } => "receive_atoken",
            _ => "receive_underlying",
        };
        enriched.insert("liquidation_method", json!(method));

        Ok(enriched)
    }
}
