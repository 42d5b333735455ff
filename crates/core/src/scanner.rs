//! Cross-protocol liquidation scanner.
//!
//! Runs every registered protocol processor over transactions, blocks, or
//! block ranges and aggregates decoded liquidations into deterministic,
//! protocol-grouped results. Failures are isolated per (transaction,
//! protocol) pair: one processor's decode or enrichment error never aborts
//! the others, and nothing detected is dropped without a diagnostic.

use std::collections::{BTreeMap, HashSet};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::B256;
use alloy::rpc::types::Filter;
use chrono::{DateTime, Utc};
use futures::future;
use futures::stream::{self, StreamExt};
use serde::{Serialize, Serializer};
use thiserror::Error;
use tracing::{debug, info, warn};

use oev_chain::{
    ChainReader, ClientError, EnrichedLiquidationEvent, LiquidationEvent, MalformedEvent,
    ProcessorRegistry, Protocol, ProtocolProcessor, RawLog, TransactionContext,
};

use crate::config::ScanConfig;

/// Scanner runtime configuration.
#[derive(Debug, Clone)]
pub struct ScannerConfig {
    /// Concurrent per-transaction analyses within a scan
    pub concurrency: usize,
    /// Deadline applied to every external read
    pub call_timeout: Duration,
    /// Whether to run enrichment after decoding
    pub enrich: bool,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            concurrency: 8,
            call_timeout: Duration::from_secs(10),
            enrich: true,
        }
    }
}

impl ScannerConfig {
    /// Derive from the loaded scan configuration.
    pub fn from_config(config: &ScanConfig) -> Self {
        Self {
            concurrency: config.scanner.concurrency,
            call_timeout: config.call_timeout(),
            enrich: config.scanner.enrich,
        }
    }
}

/// Scan failure kind, attributed per (transaction, protocol) pair.
#[derive(Debug, Clone, Error)]
pub enum ScanErrorKind {
    /// A matched log's payload was structurally invalid
    #[error(transparent)]
    Malformed(#[from] MalformedEvent),
    /// An enrichment read failed; the unenriched event was kept
    #[error("enrichment unavailable: {0}")]
    Enrichment(String),
    /// The external client failed
    #[error("transport: {0}")]
    Transport(String),
    /// An external read exceeded its deadline
    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

impl From<ClientError> for ScanErrorKind {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Timeout(deadline) => Self::Timeout(deadline),
            other => Self::Transport(other.to_string()),
        }
    }
}

impl Serialize for ScanErrorKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One recorded scan failure.
#[derive(Debug, Clone, Error, Serialize)]
#[error("{kind}")]
pub struct ScanError {
    /// Protocol the failure is attributed to, if any
    pub protocol: Option<Protocol>,
    /// Transaction the failure occurred in, if known
    pub transaction_hash: Option<B256>,
    #[source]
    pub kind: ScanErrorKind,
}

/// Events of one protocol, in (log index, sub-event index) order.
#[derive(Debug, Clone, Serialize)]
pub struct ProtocolGroup {
    pub protocol: Protocol,
    pub events: Vec<EnrichedLiquidationEvent>,
}

/// Result of analyzing a single transaction.
#[derive(Debug, Clone, Serialize)]
pub struct TransactionAnalysis {
    pub transaction_hash: B256,
    pub block_number: u64,
    pub transaction_index: u64,
    /// Non-empty protocol groups, in registry registration order
    pub groups: Vec<ProtocolGroup>,
    pub errors: Vec<ScanError>,
}

impl TransactionAnalysis {
    /// No liquidations and no failures.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty() && self.errors.is_empty()
    }

    fn failed(block_number: u64, transaction_hash: B256, error: ScanError) -> Self {
        Self {
            transaction_hash,
            block_number,
            transaction_index: 0,
            groups: Vec::new(),
            errors: vec![error],
        }
    }
}

/// Result of analyzing one block.
#[derive(Debug, Clone, Serialize)]
pub struct BlockAnalysisResult {
    pub block_number: u64,
    /// Non-empty protocol groups, in registry registration order
    pub groups: Vec<ProtocolGroup>,
    pub errors: Vec<ScanError>,
}

/// Result of analyzing a block range.
#[derive(Debug, Clone, Serialize)]
pub struct RangeAnalysis {
    pub from_block: u64,
    pub to_block: u64,
    /// Per-block results in ascending block order; blocks with neither
    /// events nor errors are omitted
    pub blocks: Vec<BlockAnalysisResult>,
    /// Candidate transactions run through the full pipeline
    pub transactions_scanned: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Whether the scan stopped early on request
    pub aborted: bool,
}

/// Handle for aborting an in-flight scan between transactions.
#[derive(Debug, Clone)]
pub struct ScanAbort(Arc<AtomicBool>);

impl ScanAbort {
    /// Request the scan to stop. Transactions already being analyzed finish
    /// and their results are kept; no new transactions are scheduled.
    pub fn abort(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Cross-protocol scanner.
///
/// Holds only shared read-only state: the client, the processor registry
/// and the runtime configuration. Every per-transaction analysis is atomic;
/// concurrent analyses share nothing mutable.
pub struct Scanner {
    client: Arc<dyn ChainReader>,
    registry: Arc<ProcessorRegistry>,
    config: ScannerConfig,
    abort: Arc<AtomicBool>,
}

impl Scanner {
    /// Create a new scanner.
    pub fn new(
        client: Arc<dyn ChainReader>,
        registry: Arc<ProcessorRegistry>,
        config: ScannerConfig,
    ) -> Self {
        Self {
            client,
            registry,
            config,
            abort: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Handle for aborting in-flight scans.
    pub fn abort_handle(&self) -> ScanAbort {
        ScanAbort(self.abort.clone())
    }

    /// Analyze a single transaction across every registered protocol.
    ///
    /// Errs only when the transaction or its receipt cannot be fetched;
    /// per-protocol decode and enrichment failures are recorded in the
    /// returned analysis instead.
    pub async fn analyze_transaction(&self, tx_hash: B256) -> Result<TransactionAnalysis, ScanError> {
        let tx = self
            .timed(self.client.get_transaction(tx_hash))
            .await
            .map_err(|kind| ScanError {
                protocol: None,
                transaction_hash: Some(tx_hash),
                kind,
            })?;
        let logs = self
            .timed(self.client.get_transaction_receipt(tx_hash))
            .await
            .map_err(|kind| ScanError {
                protocol: None,
                transaction_hash: Some(tx_hash),
                kind,
            })?;

        Ok(self.analyze_context(&tx, &logs).await)
    }

    /// Analyze one block: every transaction, every processor.
    pub async fn analyze_block(&self, block_number: u64) -> Result<BlockAnalysisResult, ScanError> {
        let hashes = self
            .timed(self.client.block_transactions(block_number))
            .await
            .map_err(|kind| ScanError {
                protocol: None,
                transaction_hash: None,
                kind,
            })?;

        debug!(block_number, transactions = hashes.len(), "Analyzing block");
        let items: Vec<(u64, B256)> = hashes.into_iter().map(|h| (block_number, h)).collect();
        let analyses = self.analyze_many(items).await;
        Ok(self.merge_block(block_number, analyses))
    }

    /// Analyze an inclusive block range.
    ///
    /// Candidate transactions are located through a topic-filtered
    /// `get_logs` over every registered liquidation signature, then run
    /// through the full matcher-gated pipeline. Final ordering is by block
    /// number, then transaction index, regardless of worker completion
    /// order.
    pub async fn analyze_range(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> Result<RangeAnalysis, ScanError> {
        let started_at = Utc::now();

        let filter = Filter::new()
            .from_block(from_block)
            .to_block(to_block)
            .event_signature(self.registry.liquidation_topics());
        let logs = self
            .timed(self.client.get_logs(&filter))
            .await
            .map_err(|kind| ScanError {
                protocol: None,
                transaction_hash: None,
                kind,
            })?;

        let mut seen = HashSet::new();
        let mut candidates: Vec<(u64, B256)> = Vec::new();
        for log in &logs {
            if seen.insert(log.transaction_hash) {
                candidates.push((log.block_number, log.transaction_hash));
            }
        }
        info!(
            from_block,
            to_block,
            candidates = candidates.len(),
            "Range prefilter complete"
        );

        let transactions_scanned = candidates.len() as u64;
        let analyses = self.analyze_many(candidates).await;

        let mut by_block: BTreeMap<u64, Vec<TransactionAnalysis>> = BTreeMap::new();
        for analysis in analyses {
            by_block
                .entry(analysis.block_number)
                .or_default()
                .push(analysis);
        }
        let blocks = by_block
            .into_iter()
            .map(|(block_number, list)| self.merge_block(block_number, list))
            .filter(|block| !block.groups.is_empty() || !block.errors.is_empty())
            .collect();

        Ok(RangeAnalysis {
            from_block,
            to_block,
            blocks,
            transactions_scanned,
            started_at,
            finished_at: Utc::now(),
            aborted: self.abort.load(Ordering::SeqCst),
        })
    }

    /// Run every processor over one transaction's log set.
    async fn analyze_context(
        &self,
        tx: &TransactionContext,
        logs: &[RawLog],
    ) -> TransactionAnalysis {
        let mut groups = Vec::new();
        let mut errors = Vec::new();

        // Processors are tried independently and exhaustively: one
        // transaction may contain liquidations from several protocols.
        for processor in self.registry.processors() {
            let protocol = processor.protocol();
            if !processor.is_liquidation_transaction(tx, logs) {
                continue;
            }

            let decoded = processor.decode_transaction(logs);
            errors.extend(decoded.errors.into_iter().map(|err| ScanError {
                protocol: Some(protocol),
                transaction_hash: Some(tx.hash),
                kind: err.into(),
            }));

            let mut events = Vec::with_capacity(decoded.events.len());
            for event in decoded.events {
                if self.config.enrich {
                    match self.timed_enrich(processor.as_ref(), &event).await {
                        Ok(enriched) => events.push(enriched),
                        Err(kind) => {
                            // Detection outranks enrichment: keep the bare
                            // event alongside the diagnostic.
                            warn!(
                                protocol = %protocol,
                                tx = %tx.hash,
                                error = %kind,
                                "Enrichment failed, keeping unenriched event"
                            );
                            errors.push(ScanError {
                                protocol: Some(protocol),
                                transaction_hash: Some(tx.hash),
                                kind,
                            });
                            events.push(EnrichedLiquidationEvent::unenriched(event));
                        }
                    }
                } else {
                    events.push(EnrichedLiquidationEvent::unenriched(event));
                }
            }

            if !events.is_empty() {
                events.sort_by_key(|e| (e.event.log_index, e.event.sub_event_index));
                groups.push(ProtocolGroup { protocol, events });
            }
        }

        TransactionAnalysis {
            transaction_hash: tx.hash,
            block_number: tx.block_number,
            transaction_index: tx.transaction_index,
            groups,
            errors,
        }
    }

    /// Analyze transactions with bounded concurrency, stopping the intake
    /// when an abort is requested.
    async fn analyze_many(&self, items: Vec<(u64, B256)>) -> Vec<TransactionAnalysis> {
        stream::iter(items)
            .take_while(|_| future::ready(!self.abort.load(Ordering::SeqCst)))
            .map(|(block_number, hash)| async move {
                match self.analyze_transaction(hash).await {
                    Ok(analysis) => analysis,
                    Err(error) => {
                        warn!(tx = %hash, error = %error, "Transaction analysis failed");
                        TransactionAnalysis::failed(block_number, hash, error)
                    }
                }
            })
            .buffer_unordered(self.config.concurrency.max(1))
            .collect()
            .await
    }

    /// Merge per-transaction analyses into one deterministic block result:
    /// protocols in registration order, transactions by ascending index.
    fn merge_block(
        &self,
        block_number: u64,
        mut analyses: Vec<TransactionAnalysis>,
    ) -> BlockAnalysisResult {
        analyses.sort_by_key(|a| a.transaction_index);

        let mut groups = Vec::new();
        for processor in self.registry.processors() {
            let protocol = processor.protocol();
            let events: Vec<EnrichedLiquidationEvent> = analyses
                .iter()
                .flat_map(|analysis| {
                    analysis
                        .groups
                        .iter()
                        .filter(|group| group.protocol == protocol)
                        .flat_map(|group| group.events.iter().cloned())
                })
                .collect();
            if !events.is_empty() {
                groups.push(ProtocolGroup { protocol, events });
            }
        }

        let errors = analyses
            .iter()
            .flat_map(|analysis| analysis.errors.iter().cloned())
            .collect();

        BlockAnalysisResult {
            block_number,
            groups,
            errors,
        }
    }

    async fn timed<T, F>(&self, fut: F) -> Result<T, ScanErrorKind>
    where
        F: Future<Output = Result<T, ClientError>> + Send,
    {
        match tokio::time::timeout(self.config.call_timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(err.into()),
            Err(_) => Err(ScanErrorKind::Timeout(self.config.call_timeout)),
        }
    }

    async fn timed_enrich(
        &self,
        processor: &dyn ProtocolProcessor,
        event: &LiquidationEvent,
    ) -> Result<EnrichedLiquidationEvent, ScanErrorKind> {
        match tokio::time::timeout(
            self.config.call_timeout,
            processor.enrich_event(event, self.client.as_ref()),
        )
        .await
        {
            Ok(Ok(enriched)) => Ok(enriched),
            Ok(Err(err)) => Err(ScanErrorKind::Enrichment(err.to_string())),
            Err(_) => Err(ScanErrorKind::Timeout(self.config.call_timeout)),
        }
    }
}
