//! Morpho Blue liquidation processor (Ethereum mainnet singleton).
//!
//! Morpho Blue emits one `Liquidate` event per liquidation from the
//! singleton contract. The log carries only the market id, not the token
//! addresses; enrichment resolves the market parameters through
//! `idToMarketParams` and derives the liquidation incentive factor from the
//! market's LLTV.

use alloy::primitives::{address, Address, B256};
use alloy::sol;
use alloy::sol_types::{SolCall, SolEvent};
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
    /// Singleton liquidation event.
    event Liquidate(
        bytes32 indexed id,
        address indexed caller,
        address indexed borrower,
        uint256 repaidAssets,
        uint256 repaidShares,
        uint256 seizedAssets,
        uint256 badDebtAssets,
        uint256 badDebtShares
    );

    /// Market parameter read used for enrichment.
    interface IMorpho {
        function idToMarketParams(bytes32 id)
            external
            view
            returns (
                address loanToken,
                address collateralToken,
                address oracle,
                address irm,
                uint256 lltv
            );
    }
}

/// Morpho Blue singleton (Ethereum mainnet).
pub const MORPHO_BLUE: Address = address!("BBBBBbbBBb9cC5e90e3b3Af64bdAF62C37EEFFCb");

/// Liquidation incentive curve parameters from the Morpho Blue paper.
const LIQUIDATION_CURSOR: f64 = 0.3;
const MAX_LIQUIDATION_INCENTIVE_FACTOR: f64 = 1.15;

const LIQUIDATE_FIELDS: &[EventField] = &[
    EventField {
        name: "id",
        kind: FieldKind::Bytes32,
        indexed: true,
    },
    EventField {
        name: "caller",
        kind: FieldKind::Address,
        indexed: true,
    },
    EventField {
        name: "borrower",
        kind: FieldKind::Address,
        indexed: true,
    },
    EventField {
        name: "repaidAssets",
        kind: FieldKind::Uint256,
        indexed: false,
    },
    EventField {
        name: "repaidShares",
        kind: FieldKind::Uint256,
        indexed: false,
    },
    EventField {
        name: "seizedAssets",
        kind: FieldKind::Uint256,
        indexed: false,
    },
    EventField {
        name: "badDebtAssets",
        kind: FieldKind::Uint256,
        indexed: false,
    },
    EventField {
        name: "badDebtShares",
        kind: FieldKind::Uint256,
        indexed: false,
    },
];

/// Incentive factor a liquidator earns on a market with the given LLTV:
/// `min(1.15, 1 / (1 - 0.3 * (1 - lltv)))`.
pub fn liquidation_incentive_factor(lltv: f64) -> f64 {
    if lltv >= 1.0 {
        return MAX_LIQUIDATION_INCENTIVE_FACTOR;
    }
    let denominator = 1.0 - LIQUIDATION_CURSOR * (1.0 - lltv);
    if denominator <= 0.0 {
        return MAX_LIQUIDATION_INCENTIVE_FACTOR;
    }
    MAX_LIQUIDATION_INCENTIVE_FACTOR.min(1.0 / denominator)
}

/// Morpho Blue protocol processor.
#[derive(Debug)]
pub struct MorphoProcessor {
    signatures: [EventSignature; 1],
    emitters: [Address; 1],
}

impl MorphoProcessor {
    pub fn new() -> Self {
        Self {
            signatures: [EventSignature::new(
                Protocol::Morpho,
                "Liquidate",
                Liquidate::SIGNATURE,
                LIQUIDATE_FIELDS,
            )],
            emitters: [MORPHO_BLUE],
        }
    }
}

impl Default for MorphoProcessor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProtocolProcessor for MorphoProcessor {
    fn protocol(&self) -> Protocol {
        Protocol::Morpho
    }

    fn signatures(&self) -> &[EventSignature] {
        &self.signatures
    }

    fn emitters(&self) -> Option<&[Address]> {
        Some(&self.emitters)
    }

    fn decode_liquidation(&self, log: &RawLog) -> DecodeOutcome {
        match log.topic0() {
            Some(topic) if *topic == Liquidate::SIGNATURE_HASH => {}
            _ => return DecodeOutcome::NotThisEvent,
        }

        let ev = match decode_event::<Liquidate>(Protocol::Morpho, log) {
            Ok(ev) => ev,
            Err(err) => return DecodeOutcome::Malformed(err),
        };

        DecodeOutcome::Event(LiquidationEvent {
            protocol: Protocol::Morpho,
            transaction_hash: log.transaction_hash,
            block_number: log.block_number,
            liquidator: ev.caller,
            user: ev.borrower,
            debt_repaid: AssetAmount {
                asset: AssetRef::Market(ev.id),
                amount: ev.repaidAssets,
            },
            collateral_seized: AssetAmount {
                asset: AssetRef::Market(ev.id),
                amount: ev.seizedAssets,
            },
            sub_event_index: None,
            log_index: log.log_index,
            detail: ProtocolDetail::Morpho {
                repaid_shares: ev.repaidShares,
                bad_debt_assets: ev.badDebtAssets,
                bad_debt_shares: ev.badDebtShares,
            },
        })
    }

    async fn enrich_event(
        &self,
        event: &LiquidationEvent,
        client: &dyn ChainReader,
    ) -> Result<EnrichedLiquidationEvent, EnrichmentError> {
        let AssetRef::Market(id) = event.debt_repaid.asset else {
            return Err(EnrichmentError::Unavailable(
                "event is not market-denominated".to_string(),
            ));
        };

        let calldata = IMorpho::idToMarketParamsCall { id }.abi_encode();
        let ret = client.call(MORPHO_BLUE, calldata.into()).await?;
        let params = IMorpho::idToMarketParamsCall::abi_decode_returns(&ret, true)
            .map_err(|e| EnrichmentError::Unavailable(format!("market params: {e}")))?;

        if params.loanToken == Address::ZERO {
            return Err(EnrichmentError::Unavailable(format!(
                "unknown market {id}"
            )));
        }

        let lltv = wad_to_f64(params.lltv);

        let mut enriched = EnrichedLiquidationEvent::unenriched(event.clone());
        enriched.insert("loan_token", json!(params.loanToken));
        enriched.insert("collateral_token", json!(params.collateralToken));
        enriched.insert("oracle", json!(params.oracle));
        enriched.insert("irm", json!(params.irm));
        enriched.insert("lltv", json!(lltv));
        enriched.insert(
            "liquidation_incentive_factor",
            json!(liquidation_incentive_factor(lltv)),
        );
        if let ProtocolDetail::Morpho {
            bad_debt_assets, ..
        } = event.detail
        {
            enriched.insert("has_bad_debt", json!(!bad_debt_assets.is_zero()));
        }
        Ok(enriched)
    }
}
