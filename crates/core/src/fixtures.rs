//! Known-liquidation fixture records.
//!
//! The persisted fixture format maps a protocol name to an ordered sequence
//! of real liquidation transactions with their expected liquidator and user
//! addresses. Conformance tests replay these through the full pipeline and
//! check the decoded addresses field-for-field.

use std::collections::BTreeMap;
use std::path::Path;

use alloy::primitives::{Address, B256};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use oev_chain::Protocol;

/// Fixture loading errors.
#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("failed to read fixture file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse fixture file: {0}")]
    Json(#[from] serde_json::Error),
}

/// One known liquidation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnownLiquidation {
    pub block: u64,
    pub tx_hash: B256,
    pub liquidator: Address,
    pub user: Address,
    pub description: String,
}

/// Fixture set: protocol name to ordered liquidation records.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LiquidationFixtures(BTreeMap<String, Vec<KnownLiquidation>>);

impl LiquidationFixtures {
    /// Parse from a JSON string.
    pub fn from_json_str(s: &str) -> Result<Self, FixtureError> {
        Ok(serde_json::from_str(s)?)
    }

    /// Load from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, FixtureError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Records for one protocol, empty when absent.
    pub fn for_protocol(&self, protocol: Protocol) -> &[KnownLiquidation] {
        self.0
            .get(protocol.as_str())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Iterate protocol names with their records.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[KnownLiquidation])> {
        self.0.iter().map(|(name, records)| (name.as_str(), records.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(Vec::is_empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "aave_v3": [
            {
                "block": 18500000,
                "tx_hash": "0x1212121212121212121212121212121212121212121212121212121212121212",
                "liquidator": "0x1111111111111111111111111111111111111111",
                "user": "0x2222222222222222222222222222222222222222",
                "description": "Example Aave V3 liquidation"
            }
        ],
        "morpho": []
    }"#;

    #[test]
    fn test_parse_and_lookup() {
        let fixtures = LiquidationFixtures::from_json_str(SAMPLE).unwrap();
        assert_eq!(fixtures.len(), 1);

        let aave = fixtures.for_protocol(Protocol::AaveV3);
        assert_eq!(aave.len(), 1);
        assert_eq!(aave[0].block, 18_500_000);
        assert_eq!(
            aave[0].liquidator,
            "0x1111111111111111111111111111111111111111"
                .parse::<Address>()
                .unwrap()
        );

        assert!(fixtures.for_protocol(Protocol::Morpho).is_empty());
        assert!(fixtures.for_protocol(Protocol::EulerV2).is_empty());
    }

    #[test]
    fn test_invalid_json_rejected() {
        assert!(matches!(
            LiquidationFixtures::from_json_str("{ not json"),
            Err(FixtureError::Json(_))
        ));
    }
}
