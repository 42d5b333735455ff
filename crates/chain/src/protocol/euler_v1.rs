//! Euler V1 liquidation processor (Ethereum mainnet monolith).
//!
//! Euler V1 emits a single `Liquidation` event per liquidation through the
//! main Euler contract. The log already carries the violator's health score
//! and the discount parameters, so enrichment is pure computation.

use alloy::primitives::{address, Address};
use alloy::sol;
use alloy::sol_types::SolEvent;
use async_trait::async_trait;
use serde_json::json;

use super::{
    decode_event, wad_to_f64, AssetAmount, AssetRef, DecodeOutcome, EnrichedLiquidationEvent,
    EnrichmentError, EventField, EventSignature, FieldKind, LiquidationEvent, Protocol,
    ProtocolDetail, ProtocolProcessor,
};
use crate::provider::ChainReader;
use crate::types::RawLog;

sol! {
    /// Liquidation event emitted by the Euler main contract.
    ///
    /// The sixth field is named `yield` in the original ABI; field names do
    /// not participate in the signature hash.
    event Liquidation(
        address indexed liquidator,
        address indexed violator,
        address indexed underlying,
        address collateral,
        uint256 repay,
        uint256 yieldBalance,
        uint256 healthScore,
        uint256 baseDiscount,
        uint256 discount
    );
}

/// Euler V1 main contract (Ethereum mainnet).
pub const EULER: Address = address!("27182842E098f60e3D576794A5bFFb0777E025d3");

const LIQUIDATION_FIELDS: &[EventField] = &[
    EventField {
        name: "liquidator",
        kind: FieldKind::Address,
        indexed: true,
    },
    EventField {
        name: "violator",
        kind: FieldKind::Address,
        indexed: true,
    },
    EventField {
        name: "underlying",
        kind: FieldKind::Address,
        indexed: true,
    },
    EventField {
        name: "collateral",
        kind: FieldKind::Address,
        indexed: false,
    },
    EventField {
        name: "repay",
        kind: FieldKind::Uint256,
        indexed: false,
    },
    EventField {
        name: "yield",
        kind: FieldKind::Uint256,
        indexed: false,
    },
    EventField {
        name: "healthScore",
        kind: FieldKind::Uint256,
        indexed: false,
    },
    EventField {
        name: "baseDiscount",
        kind: FieldKind::Uint256,
        indexed: false,
    },
    EventField {
        name: "discount",
        kind: FieldKind::Uint256,
        indexed: false,
    },
];

/// Euler V1 protocol processor.
#[derive(Debug)]
pub struct EulerV1Processor {
    signatures: [EventSignature; 1],
    emitters: [Address; 1],
}

impl EulerV1Processor {
    pub fn new() -> Self {
        Self {
            signatures: [EventSignature::new(
                Protocol::EulerV1,
                "Liquidation",
                Liquidation::SIGNATURE,
                LIQUIDATION_FIELDS,
            )],
            emitters: [EULER],
        }
    }
}

impl Default for EulerV1Processor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProtocolProcessor for EulerV1Processor {
    fn protocol(&self) -> Protocol {
        Protocol::EulerV1
    }

    fn signatures(&self) -> &[EventSignature] {
        &self.signatures
    }

    fn emitters(&self) -> Option<&[Address]> {
        Some(&self.emitters)
    }

    fn decode_liquidation(&self, log: &RawLog) -> DecodeOutcome {
        match log.topic0() {
            Some(topic) if *topic == Liquidation::SIGNATURE_HASH => {}
            _ => return DecodeOutcome::NotThisEvent,
        }

        let ev = match decode_event::<Liquidation>(Protocol::EulerV1, log) {
            Ok(ev) => ev,
            Err(err) => return DecodeOutcome::Malformed(err),
        };

        DecodeOutcome::Event(LiquidationEvent {
            protocol: Protocol::EulerV1,
            transaction_hash: log.transaction_hash,
            block_number: log.block_number,
            liquidator: ev.liquidator,
            user: ev.violator,
            debt_repaid: AssetAmount {
                asset: AssetRef::Token(ev.underlying),
                amount: ev.repay,
            },
            collateral_seized: AssetAmount {
                asset: AssetRef::Token(ev.collateral),
                amount: ev.yieldBalance,
            },
            sub_event_index: None,
            log_index: log.log_index,
            detail: ProtocolDetail::EulerV1 {
                health_score: ev.healthScore,
                base_discount: ev.baseDiscount,
                discount: ev.discount,
            },
        })
    }

    async fn enrich_event(
        &self,
        event: &LiquidationEvent,
        _client: &dyn ChainReader,
    ) -> Result<EnrichedLiquidationEvent, EnrichmentError> {
        let ProtocolDetail::EulerV1 {
            health_score,
            base_discount,
            discount,
        } = event.detail
        else {
            return Err(EnrichmentError::Unavailable(
                "missing Euler V1 decode detail".to_string(),
            ));
        };

        let health_factor = wad_to_f64(health_score);
        let discount_bonus = wad_to_f64(discount.saturating_sub(base_discount));

        let mut enriched = EnrichedLiquidationEvent::unenriched(event.clone());
        enriched.insert("health_factor", json!(health_factor));
        enriched.insert("undercollateralized", json!(health_factor < 1.0));
        enriched.insert("discount_bonus", json!(discount_bonus));
        Ok(enriched)
    }
}
