//! Liquidation event signatures and field layouts.
//!
//! Each protocol processor owns an exhaustive table of the events that can
//! signal a liquidation for that protocol version, together with the
//! Keccak256 topic hash used for log filtering and the ABI field layout used
//! to validate decoding.

use alloy::primitives::{keccak256, B256};

use super::Protocol;

/// Solidity-level type of one event field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Address,
    Uint256,
    Bytes32,
    Bool,
}

/// One ABI field in an event layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventField {
    /// Field name as declared in the event ABI
    pub name: &'static str,
    /// ABI type
    pub kind: FieldKind,
    /// Whether the field is carried in a topic rather than the data payload
    pub indexed: bool,
}

/// Canonical description of one liquidation-relevant event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventSignature {
    /// Protocol this signature belongs to
    pub protocol: Protocol,
    /// Event name (e.g. "LiquidationCall")
    pub name: &'static str,
    /// Canonical signature string the topic hash derives from
    pub signature: &'static str,
    /// topic0 value for logs of this event
    pub topic: B256,
    /// Ordered field layout, indexed fields first as they appear in the ABI
    pub fields: &'static [EventField],
}

impl EventSignature {
    /// Build a signature entry, deriving the topic hash from the canonical
    /// signature string.
    pub fn new(
        protocol: Protocol,
        name: &'static str,
        signature: &'static str,
        fields: &'static [EventField],
    ) -> Self {
        Self {
            protocol,
            name,
            signature,
            topic: keccak256(signature),
            fields,
        }
    }

    /// Number of topics a conformant log carries (signature + indexed fields).
    pub fn expected_topics(&self) -> usize {
        1 + self.fields.iter().filter(|f| f.indexed).count()
    }

    /// Number of 32-byte words expected in the data payload.
    ///
    /// All liquidation events in the registered protocols use only static
    /// types, so the payload length is fixed.
    pub fn data_words(&self) -> usize {
        self.fields.iter().filter(|f| !f.indexed).count()
    }
}
