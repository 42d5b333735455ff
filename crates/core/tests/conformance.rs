//! Fixture-driven conformance tests.
//!
//! Every record in the known-liquidation fixture set must round-trip
//! through the full pipeline: the protocol's matcher accepts the
//! transaction, the decoder reproduces the recorded liquidator and user,
//! and the scanner reports them with an empty error list for that protocol.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{address, keccak256, Address, Bytes, B256, U256};
use alloy::rpc::types::Filter;
use alloy::sol_types::SolValue;
use async_trait::async_trait;
use smallvec::SmallVec;

use oev_chain::{
    ChainReader, ClientError, ProcessorRegistry, Protocol, ProtocolProcessor, RawLog,
    TransactionContext,
};
use oev_core::{KnownLiquidation, LiquidationFixtures, Scanner, ScannerConfig};

const AAVE_POOL: Address = address!("87870Bca3F3fD6335C3F4ce8392D69350B4fA4E2");
const EULER: Address = address!("27182842E098f60e3D576794A5bFFb0777E025d3");
const MORPHO_BLUE: Address = address!("BBBBBbbBBb9cC5e90e3b3Af64bdAF62C37EEFFCb");
const WETH: Address = address!("C02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2");
const USDC: Address = address!("A0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48");
const DEBT_VAULT: Address = address!("A0b86a33E6bA3b93b63e1FbB4f4bb4f4Bb4F4bb4");
const COLLATERAL_VAULT: Address = address!("1111111111111111111111111111111111111111");

fn fixtures() -> LiquidationFixtures {
    let path = concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/tests/fixtures/known_liquidations.json"
    );
    LiquidationFixtures::from_path(path).expect("fixture file parses")
}

/// In-memory chain answering from registered transactions.
#[derive(Debug, Default)]
struct FixtureChain {
    txs: HashMap<B256, (TransactionContext, Vec<RawLog>)>,
}

impl FixtureChain {
    fn insert(&mut self, tx: TransactionContext, logs: Vec<RawLog>) {
        self.txs.insert(tx.hash, (tx, logs));
    }
}

#[async_trait]
impl ChainReader for FixtureChain {
    async fn get_transaction(&self, hash: B256) -> Result<TransactionContext, ClientError> {
        self.txs
            .get(&hash)
            .map(|(tx, _)| tx.clone())
            .ok_or(ClientError::NotFound("transaction"))
    }

    async fn get_transaction_receipt(&self, hash: B256) -> Result<Vec<RawLog>, ClientError> {
        self.txs
            .get(&hash)
            .map(|(_, logs)| logs.clone())
            .ok_or(ClientError::NotFound("receipt"))
    }

    async fn get_logs(&self, _filter: &Filter) -> Result<Vec<RawLog>, ClientError> {
        Ok(Vec::new())
    }

    async fn call(&self, _to: Address, _data: Bytes) -> Result<Bytes, ClientError> {
        Err(ClientError::NotFound("contract"))
    }

    async fn block_transactions(&self, _block_number: u64) -> Result<Vec<B256>, ClientError> {
        Ok(Vec::new())
    }
}

fn tx_context(record: &KnownLiquidation) -> TransactionContext {
    TransactionContext {
        hash: record.tx_hash,
        to: None,
        input: Bytes::new(),
        block_number: record.block,
        transaction_index: 0,
    }
}

/// Build a conformant liquidation log carrying the fixture's addresses.
fn synthetic_log(protocol: Protocol, record: &KnownLiquidation, log_index: u64) -> RawLog {
    let (address, topics, data): (Address, Vec<B256>, Vec<u8>) = match protocol {
        Protocol::AaveV3 => (
            AAVE_POOL,
            vec![
                keccak256("LiquidationCall(address,address,address,uint256,uint256,address,bool)"),
                WETH.into_word(),
                USDC.into_word(),
                record.user.into_word(),
            ],
            (
                U256::from(1_000_000_000u64),
                U256::from(500_000_000_000_000_000u64),
                record.liquidator,
                false,
            )
                .abi_encode(),
        ),
        Protocol::EulerV1 => (
            EULER,
            vec![
                keccak256(
                    "Liquidation(address,address,address,address,uint256,uint256,uint256,uint256,uint256)",
                ),
                record.liquidator.into_word(),
                record.user.into_word(),
                USDC.into_word(),
            ],
            (
                WETH,
                U256::from(500u64),
                U256::from(520u64),
                U256::from(940_000_000_000_000_000u64),
                U256::from(20_000_000_000_000_000u64),
                U256::from(55_000_000_000_000_000u64),
            )
                .abi_encode(),
        ),
        Protocol::EulerV2 => (
            DEBT_VAULT,
            vec![
                keccak256(
                    "Liquidation(address,address,address,address,uint256,uint256,uint256,uint256)",
                ),
                record.liquidator.into_word(),
                record.user.into_word(),
                DEBT_VAULT.into_word(),
            ],
            (
                COLLATERAL_VAULT,
                U256::from(1_000u64),
                U256::from(1_050u64),
                U256::from(1_040u64),
                U256::from(50_000_000_000_000_000u64),
            )
                .abi_encode(),
        ),
        Protocol::Morpho => (
            MORPHO_BLUE,
            vec![
                keccak256(
                    "Liquidate(bytes32,address,address,uint256,uint256,uint256,uint256,uint256)",
                ),
                B256::repeat_byte(0xaa),
                record.liquidator.into_word(),
                record.user.into_word(),
            ],
            (
                U256::from(2_000u64),
                U256::from(1_900u64),
                U256::from(2_100u64),
                U256::ZERO,
                U256::ZERO,
            )
                .abi_encode(),
        ),
    };

    RawLog {
        address,
        topics: SmallVec::from_slice(&topics),
        data: data.into(),
        block_number: record.block,
        transaction_hash: record.tx_hash,
        log_index,
    }
}

fn scanner(chain: FixtureChain) -> Scanner {
    Scanner::new(
        Arc::new(chain),
        Arc::new(ProcessorRegistry::all()),
        ScannerConfig {
            concurrency: 2,
            call_timeout: Duration::from_millis(200),
            enrich: false,
        },
    )
}

#[test]
fn fixture_file_covers_every_protocol() {
    let fixtures = fixtures();
    assert!(!fixtures.is_empty());
    for (name, records) in fixtures.iter() {
        let protocol = Protocol::parse(name).expect("fixture protocol name parses");
        assert!(
            !records.is_empty(),
            "no fixture records for {protocol}"
        );
    }
    for protocol in [
        Protocol::AaveV3,
        Protocol::EulerV1,
        Protocol::EulerV2,
        Protocol::Morpho,
    ] {
        assert!(!fixtures.for_protocol(protocol).is_empty());
    }
}

#[tokio::test]
async fn fixtures_round_trip_through_matcher_and_decoder() {
    let fixtures = fixtures();
    let registry = ProcessorRegistry::all();

    for (name, records) in fixtures.iter() {
        let protocol = Protocol::parse(name).unwrap();
        let processor = registry.get(protocol).unwrap();

        for record in records {
            let tx = tx_context(record);
            let logs = vec![synthetic_log(protocol, record, 0)];

            assert!(
                processor.is_liquidation_transaction(&tx, &logs),
                "{protocol} matcher rejected fixture {}",
                record.tx_hash
            );

            let mut chain = FixtureChain::default();
            chain.insert(tx, logs);

            let analysis = scanner(chain)
                .analyze_transaction(record.tx_hash)
                .await
                .unwrap();

            let group = analysis
                .groups
                .iter()
                .find(|g| g.protocol == protocol)
                .unwrap_or_else(|| panic!("{protocol} missing from analysis"));
            assert_eq!(group.events.len(), 1);

            let event = &group.events[0].event;
            assert_eq!(event.liquidator, record.liquidator, "{}", record.description);
            assert_eq!(event.user, record.user, "{}", record.description);
            assert_eq!(event.transaction_hash, record.tx_hash);
            assert_eq!(event.block_number, record.block);
            assert!(
                !analysis.errors.iter().any(|e| e.protocol == Some(protocol)),
                "unexpected {protocol} errors for {}",
                record.tx_hash
            );
        }
    }
}

#[tokio::test]
async fn batched_euler_v2_fixture_decodes_every_sub_event() {
    let record = KnownLiquidation {
        block: 20_100_000,
        tx_hash: B256::repeat_byte(0x42),
        liquidator: Address::repeat_byte(0x01),
        user: Address::repeat_byte(0x02),
        description: "batched vault liquidation".to_string(),
    };

    let mut logs: Vec<RawLog> = (0..3)
        .map(|i| synthetic_log(Protocol::EulerV2, &record, i))
        .collect();
    let header = RawLog {
        address: DEBT_VAULT,
        topics: SmallVec::from_slice(&[
            keccak256("BatchLiquidation(address,uint256)"),
            record.liquidator.into_word(),
        ]),
        data: U256::from(3u64).abi_encode().into(),
        block_number: record.block,
        transaction_hash: record.tx_hash,
        log_index: 3,
    };
    logs.push(header);

    let mut chain = FixtureChain::default();
    chain.insert(tx_context(&record), logs);

    let analysis = scanner(chain)
        .analyze_transaction(record.tx_hash)
        .await
        .unwrap();

    assert_eq!(analysis.groups.len(), 1);
    let group = &analysis.groups[0];
    assert_eq!(group.protocol, Protocol::EulerV2);
    assert_eq!(group.events.len(), 3);

    let indices: Vec<u32> = group
        .events
        .iter()
        .map(|e| e.event.sub_event_index.unwrap())
        .collect();
    assert_eq!(indices, vec![0, 1, 2]);
    assert!(group
        .events
        .iter()
        .all(|e| e.event.transaction_hash == record.tx_hash));
    assert!(analysis.errors.is_empty());
}
