//! Euler V2 liquidation processor (vault kit).
//!
//! Euler V2 settles liquidations through per-market vaults deployed
//! permissionlessly, so there is no fixed emitter set to gate on. A single
//! transaction may batch several vault liquidations; the batch container
//! event declares the count while each sub-liquidation is its own
//! `Liquidation` log. Enrichment resolves the underlying ERC-20 of the debt
//! and collateral vaults.

use alloy::primitives::Address;
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
    /// Per-vault liquidation event.
    event Liquidation(
        address indexed liquidator,
        address indexed violator,
        address indexed vault,
        address collateralVault,
        uint256 repayAssets,
        uint256 yieldBalance,
        uint256 collateralSeized,
        uint256 discount
    );

    /// Container event for batched vault liquidations.
    event BatchLiquidation(
        address indexed liquidator,
        uint256 numberOfLiquidations
    );

    /// Minimal vault surface used for enrichment.
    interface IEVault {
        function asset() external view returns (address);
    }
}

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
        name: "vault",
        kind: FieldKind::Address,
        indexed: true,
    },
    EventField {
        name: "collateralVault",
        kind: FieldKind::Address,
        indexed: false,
    },
    EventField {
        name: "repayAssets",
        kind: FieldKind::Uint256,
        indexed: false,
    },
    EventField {
        name: "yieldBalance",
        kind: FieldKind::Uint256,
        indexed: false,
    },
    EventField {
        name: "collateralSeized",
        kind: FieldKind::Uint256,
        indexed: false,
    },
    EventField {
        name: "discount",
        kind: FieldKind::Uint256,
        indexed: false,
    },
];

const BATCH_LIQUIDATION_FIELDS: &[EventField] = &[
    EventField {
        name: "liquidator",
        kind: FieldKind::Address,
        indexed: true,
    },
    EventField {
        name: "numberOfLiquidations",
        kind: FieldKind::Uint256,
        indexed: false,
    },
];

/// Euler V2 protocol processor.
#[derive(Debug)]
pub struct EulerV2Processor {
    signatures: [EventSignature; 2],
}

impl EulerV2Processor {
    pub fn new() -> Self {
        Self {
            signatures: [
                EventSignature::new(
                    Protocol::EulerV2,
                    "Liquidation",
                    Liquidation::SIGNATURE,
                    LIQUIDATION_FIELDS,
                ),
                EventSignature::new(
                    Protocol::EulerV2,
                    "BatchLiquidation",
                    BatchLiquidation::SIGNATURE,
                    BATCH_LIQUIDATION_FIELDS,
                ),
            ],
        }
    }

    async fn resolve_underlying(
        vault: Address,
        client: &dyn ChainReader,
    ) -> Result<Address, EnrichmentError> {
        let ret = client
            .call(vault, IEVault::assetCall {}.abi_encode().into())
            .await?;
        let decoded = IEVault::assetCall::abi_decode_returns(&ret, true)
            .map_err(|e| EnrichmentError::Unavailable(format!("vault asset: {e}")))?;
        Ok(decoded._0)
    }
}

impl Default for EulerV2Processor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProtocolProcessor for EulerV2Processor {
    fn protocol(&self) -> Protocol {
        Protocol::EulerV2
    }

    fn signatures(&self) -> &[EventSignature] {
        &self.signatures
    }

    // Vaults are deployed permissionlessly; matching is signature-driven.
    fn emitters(&self) -> Option<&[Address]> {
        None
    }

    fn decode_liquidation(&self, log: &RawLog) -> DecodeOutcome {
        match log.topic0() {
            Some(topic) if *topic == Liquidation::SIGNATURE_HASH => {
                let ev = match decode_event::<Liquidation>(Protocol::EulerV2, log) {
                    Ok(ev) => ev,
                    Err(err) => return DecodeOutcome::Malformed(err),
                };

                DecodeOutcome::Event(LiquidationEvent {
                    protocol: Protocol::EulerV2,
                    transaction_hash: log.transaction_hash,
                    block_number: log.block_number,
                    liquidator: ev.liquidator,
                    user: ev.violator,
                    debt_repaid: AssetAmount {
                        asset: AssetRef::Vault(ev.vault),
                        amount: ev.repayAssets,
                    },
                    collateral_seized: AssetAmount {
                        asset: AssetRef::Vault(ev.collateralVault),
                        amount: ev.collateralSeized,
                    },
                    sub_event_index: None,
                    log_index: log.log_index,
                    detail: ProtocolDetail::EulerV2 {
                        yield_balance: ev.yieldBalance,
                        discount: ev.discount,
                    },
                })
            }
            Some(topic) if *topic == BatchLiquidation::SIGNATURE_HASH => {
                match decode_event::<BatchLiquidation>(Protocol::EulerV2, log) {
                    Ok(ev) => DecodeOutcome::BatchHeader {
                        liquidator: ev.liquidator,
                        count: ev.numberOfLiquidations.saturating_to::<u64>(),
                    },
                    Err(err) => DecodeOutcome::Malformed(err),
                }
            }
            _ => DecodeOutcome::NotThisEvent,
        }
    }

    async fn enrich_event(
        &self,
        event: &LiquidationEvent,
        client: &dyn ChainReader,
    ) -> Result<EnrichedLiquidationEvent, EnrichmentError> {
        let (AssetRef::Vault(debt_vault), AssetRef::Vault(collateral_vault)) =
            (event.debt_repaid.asset, event.collateral_seized.asset)
        else {
            return Err(EnrichmentError::Unavailable(
                "event amounts are not vault-denominated".to_string(),
            ));
        };

        let debt_asset = Self::resolve_underlying(debt_vault, client).await?;
        let collateral_asset = Self::resolve_underlying(collateral_vault, client).await?;

        let mut enriched = EnrichedLiquidationEvent::unenriched(event.clone());
        enriched.insert("debt_asset", json!(debt_asset));
        enriched.insert("collateral_asset", json!(collateral_asset));
        if let ProtocolDetail::EulerV2 { discount, .. } = event.detail {
            enriched.insert("discount", json!(wad_to_f64(discount)));
        }
        Ok(enriched)
    }
}
