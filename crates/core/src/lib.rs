//! OEV scanner core logic.
//!
//! This crate provides:
//! - The cross-protocol scanner: transaction, block and range analysis with
//!   bounded concurrency, per-read timeouts and per-protocol error isolation
//! - Scan configuration (TOML + environment)
//! - The known-liquidation fixture format used by conformance tests
//!
//! Protocol processors and the network client live in `oev-chain`.

mod config;
mod fixtures;
mod scanner;
#[cfg(test)]
pub(crate) mod testing;

pub use config::{ConfigError, RpcConfig, ScanConfig, ScannerSettings, CONFIG_PATH_ENV, RPC_URL_ENV};
pub use fixtures::{FixtureError, KnownLiquidation, LiquidationFixtures};
pub use scanner::{
    BlockAnalysisResult, ProtocolGroup, RangeAnalysis, ScanAbort, ScanError, ScanErrorKind,
    Scanner, ScannerConfig, TransactionAnalysis,
};
