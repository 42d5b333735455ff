//! Immutable processor registry built once from configuration.
//!
//! Replaces ambient global state: the registry is constructed at process
//! start, never mutated afterwards, and handed to the scanner by `Arc`.
//! Registration order is preserved and determines result grouping order.

use std::sync::Arc;

use alloy::primitives::B256;
use thiserror::Error;
use tracing::info;

use super::{
    AaveV3Processor, EulerV1Processor, EulerV2Processor, MorphoProcessor, Protocol,
    ProtocolProcessor,
};

/// Registry construction errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// The protocol list resolved to nothing
    #[error("no protocols enabled")]
    Empty,
    /// A protocol name appeared twice
    #[error("protocol {0} registered twice")]
    Duplicate(Protocol),
}

/// Read-only set of protocol processors, in registration order.
#[derive(Debug)]
pub struct ProcessorRegistry {
    processors: Vec<Arc<dyn ProtocolProcessor>>,
}

impl ProcessorRegistry {
    /// Build a registry for the given protocols, in the given order.
    pub fn from_protocols(protocols: &[Protocol]) -> Result<Self, RegistryError> {
        if protocols.is_empty() {
            return Err(RegistryError::Empty);
        }

        let mut processors: Vec<Arc<dyn ProtocolProcessor>> = Vec::with_capacity(protocols.len());
        for &protocol in protocols {
            if processors.iter().any(|p| p.protocol() == protocol) {
                return Err(RegistryError::Duplicate(protocol));
            }
            processors.push(Self::build(protocol));
        }

        info!(
            protocols = ?processors.iter().map(|p| p.protocol()).collect::<Vec<_>>(),
            "Processor registry constructed"
        );
        Ok(Self { processors })
    }

    /// Build a registry with every supported protocol in canonical order.
    pub fn all() -> Self {
        // Infallible: the canonical list is non-empty and duplicate-free.
        Self {
            processors: vec![
                Arc::new(AaveV3Processor::new()),
                Arc::new(EulerV1Processor::new()),
                Arc::new(EulerV2Processor::new()),
                Arc::new(MorphoProcessor::new()),
            ],
        }
    }

    fn build(protocol: Protocol) -> Arc<dyn ProtocolProcessor> {
        match protocol {
            Protocol::AaveV3 => Arc::new(AaveV3Processor::new()),
            Protocol::EulerV1 => Arc::new(EulerV1Processor::new()),
            Protocol::EulerV2 => Arc::new(EulerV2Processor::new()),
            Protocol::Morpho => Arc::new(MorphoProcessor::new()),
        }
    }

    /// Registered processors in registration order.
    pub fn processors(&self) -> &[Arc<dyn ProtocolProcessor>] {
        &self.processors
    }

    /// Look up one protocol's processor.
    pub fn get(&self, protocol: Protocol) -> Option<&Arc<dyn ProtocolProcessor>> {
        self.processors.iter().find(|p| p.protocol() == protocol)
    }

    /// Every liquidation topic registered across all processors, used for
    /// log prefiltering in range scans.
    pub fn liquidation_topics(&self) -> Vec<B256> {
        self.processors
            .iter()
            .flat_map(|p| p.signatures().iter().map(|sig| sig.topic))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.processors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registration_order_preserved() {
        let registry =
            ProcessorRegistry::from_protocols(&[Protocol::Morpho, Protocol::AaveV3]).unwrap();
        let order: Vec<_> = registry.processors().iter().map(|p| p.protocol()).collect();
        assert_eq!(order, vec![Protocol::Morpho, Protocol::AaveV3]);
    }

    #[test]
    fn test_empty_and_duplicate_rejected() {
        assert_eq!(
            ProcessorRegistry::from_protocols(&[]).unwrap_err(),
            RegistryError::Empty
        );
        assert_eq!(
            ProcessorRegistry::from_protocols(&[Protocol::AaveV3, Protocol::AaveV3]).unwrap_err(),
            RegistryError::Duplicate(Protocol::AaveV3)
        );
    }

    #[test]
    fn test_all_covers_every_protocol() {
        let registry = ProcessorRegistry::all();
        assert_eq!(registry.len(), 4);
        for protocol in [
            Protocol::AaveV3,
            Protocol::EulerV1,
            Protocol::EulerV2,
            Protocol::Morpho,
        ] {
            assert!(registry.get(protocol).is_some());
        }
    }

    #[test]
    fn test_liquidation_topics_are_distinct() {
        let registry = ProcessorRegistry::all();
        let topics = registry.liquidation_topics();
        // One for Aave, Euler V1, Morpho; two for Euler V2 (event + container).
        assert_eq!(topics.len(), 5);
        let mut deduped = topics.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(deduped.len(), topics.len());
    }
}
