//! Scan configuration loaded from TOML files and environment variables.
//!
//! Configuration is resolved once at startup: a TOML file named by
//! `OEV_SCANNER_CONFIG` (falling back to built-in defaults), with the RPC
//! endpoint overridable through `OEV_RPC_HTTP_URL`.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use oev_chain::Protocol;

/// Environment variable naming the config file path.
pub const CONFIG_PATH_ENV: &str = "OEV_SCANNER_CONFIG";
/// Environment variable overriding the RPC endpoint.
pub const RPC_URL_ENV: &str = "OEV_RPC_HTTP_URL";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("unknown protocol in config: {0:?}")]
    UnknownProtocol(String),
}

/// RPC endpoint configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RpcConfig {
    /// HTTP endpoint used for all reads
    pub http_url: String,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            http_url: "https://rpc.ankr.com/eth".to_string(),
        }
    }
}

/// Scanner runtime settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScannerSettings {
    /// Concurrent per-transaction analyses within a scan
    pub concurrency: usize,
    /// Deadline for each external read
    pub call_timeout_ms: u64,
    /// Whether to run enrichment reads after decoding
    pub enrich: bool,
}

impl Default for ScannerSettings {
    fn default() -> Self {
        Self {
            concurrency: 8,
            call_timeout_ms: 10_000,
            enrich: true,
        }
    }
}

/// Top-level scan configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub rpc: RpcConfig,
    /// Enabled protocols, in registration (and therefore output) order
    pub protocols: Vec<String>,
    pub scanner: ScannerSettings,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            rpc: RpcConfig::default(),
            protocols: vec![
                "aave_v3".to_string(),
                "euler_v1".to_string(),
                "euler_v2".to_string(),
                "morpho".to_string(),
            ],
            scanner: ScannerSettings::default(),
        }
    }
}

impl ScanConfig {
    /// Parse from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Load from a TOML file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Load from the environment: `OEV_SCANNER_CONFIG` names a TOML file,
    /// otherwise defaults apply; `OEV_RPC_HTTP_URL` overrides the endpoint.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => {
                info!(path = %path, "Loading scan config from file");
                Self::from_path(path)?
            }
            Err(_) => Self::default(),
        };

        if let Ok(url) = std::env::var(RPC_URL_ENV) {
            config.rpc.http_url = url;
        }

        Ok(config)
    }

    /// Resolve the configured protocol names.
    pub fn enabled_protocols(&self) -> Result<Vec<Protocol>, ConfigError> {
        self.protocols
            .iter()
            .map(|name| {
                Protocol::parse(name).ok_or_else(|| ConfigError::UnknownProtocol(name.clone()))
            })
            .collect()
    }

    /// Per-read deadline.
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.scanner.call_timeout_ms)
    }
}
