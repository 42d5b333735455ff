//! Cross-protocol liquidation scanner CLI.
//!
//! Detects and decodes collateral liquidations across lending protocols
//! (Aave V3, Euler V1/V2, Morpho Blue) for a transaction, a block, or a
//! block range, and prints the aggregated result as JSON on stdout.
//! Logs go to stderr.

use std::sync::Arc;

use alloy::primitives::B256;
use anyhow::{bail, Context, Result};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use oev_chain::{ProcessorRegistry, ProviderManager};
use oev_core::{ScanConfig, Scanner, ScannerConfig};

const USAGE: &str = "usage: oev-scanner <tx HASH | block NUMBER | range FROM TO>";

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,oev_core=debug,oev_chain=debug")),
        )
        .init();

    let config = ScanConfig::from_env().context("loading configuration")?;
    let protocols = config.enabled_protocols()?;
    let registry = Arc::new(ProcessorRegistry::from_protocols(&protocols)?);

    info!(
        protocols = registry.len(),
        rpc = %config.rpc.http_url,
        concurrency = config.scanner.concurrency,
        "Starting OEV scanner"
    );

    let provider = Arc::new(
        ProviderManager::new(&config.rpc.http_url)
            .await
            .context("connecting to RPC endpoint")?,
    );
    let scanner = Scanner::new(provider, registry, ScannerConfig::from_config(&config));

    let args: Vec<String> = std::env::args().skip(1).collect();
    let args: Vec<&str> = args.iter().map(String::as_str).collect();

    let output = match args.as_slice() {
        ["tx", hash] => {
            let tx_hash: B256 = hash.parse().context("invalid transaction hash")?;
            let analysis = scanner.analyze_transaction(tx_hash).await?;
            serde_json::to_string_pretty(&analysis)?
        }
        ["block", number] => {
            let block_number = number.parse().context("invalid block number")?;
            let result = scanner.analyze_block(block_number).await?;
            serde_json::to_string_pretty(&result)?
        }
        ["range", from, to] => {
            let from_block: u64 = from.parse().context("invalid start block")?;
            let to_block: u64 = to.parse().context("invalid end block")?;
            if from_block > to_block {
                bail!("start block {from_block} is after end block {to_block}");
            }
            let result = scanner.analyze_range(from_block, to_block).await?;
            serde_json::to_string_pretty(&result)?
        }
        _ => bail!(USAGE),
    };

    println!("{output}");
    Ok(())
}
