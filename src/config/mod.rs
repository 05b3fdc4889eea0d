//! Configuration Management Module
//!
//! This module handles loading and validating configuration for the bridge
//! service. Configuration includes orchestration timeouts, proof validation
//! parameters, escrow limits, mempool pricing, and the set of supported
//! chains with their endpoints and validator sets.

use anyhow::{Context, Result};
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

use crate::crypto::{self, HashScheme};
use crate::types::{amount_serde, ChainId, ChainType, NetworkType};
use crate::validator::Quorum;

/// Environment variable holding the configuration file path.
pub const CONFIG_PATH_ENV: &str = "BRIDGE_CONFIG_PATH";

/// Configuration file used when the environment variable is not set.
pub const DEFAULT_CONFIG_PATH: &str = "config/bridge.toml";

// ============================================================================
// CONFIGURATION STRUCTURES
// ============================================================================

/// Main configuration structure containing all service settings.
///
/// This structure holds configuration for:
/// - Bridge orchestration (timeouts, retries, batching, network)
/// - Proof validation (freshness window, default quorum)
/// - Escrow limits
/// - Mempool size and gas pricing
/// - Every supported chain
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub bridge: BridgeOptions,
    #[serde(default)]
    pub validator: ValidatorConfig,
    #[serde(default)]
    pub escrow: EscrowConfig,
    #[serde(default)]
    pub mempool: MempoolConfig,
    #[serde(default)]
    pub chains: Vec<ChainConfig>,
}

/// Bridge orchestration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeOptions {
    /// Upper bound for creating one chain adapter (milliseconds)
    pub timeout_ms: u64,
    /// Upper bound for proof generation on the source chain (milliseconds)
    pub proof_timeout_ms: u64,
    /// Upper bound for one submission attempt on the target chain (milliseconds)
    pub submission_timeout_ms: u64,
    /// Submission attempts after a proof is validated
    pub retry_attempts: u32,
    /// Delay before the first resubmission; doubles on each further attempt (milliseconds)
    pub retry_backoff_ms: u64,
    /// Maximum number of bridge attempts running concurrently in a batch
    pub batch_size: usize,
    /// Selects the `mainnet` or `testnet` endpoint of every chain
    pub network_type: NetworkType,
}

impl Default for BridgeOptions {
    fn default() -> Self {
        Self {
            timeout_ms: 600_000,
            proof_timeout_ms: 600_000,
            submission_timeout_ms: 60_000,
            retry_attempts: 3,
            retry_backoff_ms: 500,
            batch_size: 10,
            network_type: NetworkType::Testnet,
        }
    }
}

impl BridgeOptions {
    pub fn adapter_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn proof_timeout(&self) -> Duration {
        Duration::from_millis(self.proof_timeout_ms)
    }

    pub fn submission_timeout(&self) -> Duration {
        Duration::from_millis(self.submission_timeout_ms)
    }

    /// Backoff before attempt `attempt + 1`, where `attempt` starts at 1.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u64 << attempt.saturating_sub(1).min(16);
        Duration::from_millis(self.retry_backoff_ms.saturating_mul(factor))
    }
}

/// Proof validation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    /// Oldest accepted proof age (seconds)
    pub max_proof_age_secs: u64,
    /// How far a proof timestamp may be ahead of the local clock (seconds)
    pub max_clock_skew_secs: u64,
    /// Default signature quorum for chains without an override
    pub quorum: Quorum,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            max_proof_age_secs: 3_600,
            max_clock_skew_secs: 30,
            quorum: Quorum::default(),
        }
    }
}

/// Escrow settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EscrowConfig {
    /// Smallest lockable amount, as a decimal string
    #[serde(with = "amount_serde")]
    pub min_lock_amount: BigUint,
}

impl Default for EscrowConfig {
    fn default() -> Self {
        Self {
            min_lock_amount: BigUint::from(1u32),
        }
    }
}

/// Mempool and gas pricing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MempoolConfig {
    /// Maximum number of admitted, not yet executed transactions
    pub pool_size: usize,
    /// Base gas price
    pub base_price: u64,
    /// Demand multiplier at an empty pool, in basis points (10_000 = 1x)
    pub demand_multiplier_bps: u32,
    /// Demand multiplier at a full pool, in basis points
    pub max_demand_multiplier_bps: u32,
}

impl Default for MempoolConfig {
    fn default() -> Self {
        Self {
            pool_size: 1_000,
            base_price: 1,
            demand_multiplier_bps: 10_000,
            max_demand_multiplier_bps: 30_000,
        }
    }
}

/// Endpoint of a chain on one network.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkEndpoint {
    /// RPC endpoint URL for blockchain communication
    pub rpc_url: String,
    /// Address of the bridge contract / program / module
    pub bridge_contract: String,
    /// API key for the RPC provider (optional)
    #[serde(default)]
    pub api_key: Option<String>,
}

/// Configuration for one supported chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Human-readable name for the chain
    pub name: String,
    /// Unique chain identifier
    pub chain_id: u64,
    pub chain_type: ChainType,
    /// Leaf hash scheme; defaults by chain type when unset
    #[serde(default)]
    pub hash_scheme: Option<HashScheme>,
    #[serde(default)]
    pub mainnet: Option<NetworkEndpoint>,
    #[serde(default)]
    pub testnet: Option<NetworkEndpoint>,
    /// Base64-encoded Ed25519 public keys of the chain's validators
    #[serde(default)]
    pub validator_set: Vec<String>,
    /// Quorum override for this chain
    #[serde(default)]
    pub quorum: Option<Quorum>,
    /// Base64-encoded Ed25519 private keys of validators signing in-process
    #[serde(default)]
    pub attestor_private_keys: Vec<String>,
}

impl ChainConfig {
    pub fn chain(&self) -> ChainId {
        ChainId(self.chain_id)
    }

    pub fn hash_scheme(&self) -> HashScheme {
        self.hash_scheme
            .unwrap_or_else(|| HashScheme::default_for(self.chain_type))
    }

    pub fn endpoint(&self, network: NetworkType) -> Option<&NetworkEndpoint> {
        match network {
            NetworkType::Mainnet => self.mainnet.as_ref(),
            NetworkType::Testnet => self.testnet.as_ref(),
        }
    }
}

// ============================================================================
// CONFIGURATION LOADING
// ============================================================================

impl Config {
    /// Loads configuration from the file named by `BRIDGE_CONFIG_PATH`
    /// (default `config/bridge.toml`).
    ///
    /// # Returns
    ///
    /// * `Ok(Config)` - Successfully loaded and validated configuration
    /// * `Err(anyhow::Error)` - Missing file, parse failure, or invalid settings
    pub fn load() -> Result<Self> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from_path(&path)
    }

    /// Loads configuration from a specific TOML file.
    pub fn load_from_path(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).with_context(|| {
            format!(
                "Failed to read config file: {}. Copy config/bridge.template.toml to get started",
                path
            )
        })?;
        Self::from_toml_str(&content).with_context(|| format!("Invalid config file: {}", path))
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("Failed to parse TOML")?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration, reporting every problem at once.
    pub fn validate(&self) -> Result<()> {
        let problems = self.problems();
        if problems.is_empty() {
            return Ok(());
        }
        Err(anyhow::anyhow!(
            "Invalid configuration:\n  - {}",
            problems.join("\n  - ")
        ))
    }

    /// Every configuration problem found.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();

        if self.bridge.batch_size == 0 {
            problems.push("bridge.batch_size must be at least 1".to_string());
        }
        if self.bridge.retry_attempts == 0 {
            problems.push("bridge.retry_attempts must be at least 1".to_string());
        }
        if self.bridge.proof_timeout_ms == 0 || self.bridge.submission_timeout_ms == 0 {
            problems.push("bridge timeouts must be non-zero".to_string());
        }
        if !self.validator.quorum.is_valid() {
            problems.push(format!(
                "validator.quorum {}/{} must satisfy 0 < numerator <= denominator",
                self.validator.quorum.numerator, self.validator.quorum.denominator
            ));
        }
        if self.mempool.pool_size == 0 {
            problems.push("mempool.pool_size must be at least 1".to_string());
        }
        if self.mempool.max_demand_multiplier_bps < self.mempool.demand_multiplier_bps {
            problems.push(
                "mempool.max_demand_multiplier_bps must not be below demand_multiplier_bps".to_string(),
            );
        }

        let mut seen = HashSet::new();
        for chain in &self.chains {
            if !seen.insert(chain.chain_id) {
                problems.push(format!(
                    "chain id {} is configured more than once. Each chain must have a unique chain ID",
                    chain.chain_id
                ));
            }
            if chain.endpoint(self.bridge.network_type).is_none() {
                problems.push(format!(
                    "{} ({}) has no {} endpoint",
                    chain.name, chain.chain_id, self.bridge.network_type
                ));
            }
            if chain.validator_set.is_empty() {
                problems.push(format!("{} has an empty validator_set", chain.name));
            }
            for key in &chain.validator_set {
                if let Err(e) = crypto::parse_public_key(key) {
                    problems.push(format!("{}: invalid validator key '{}': {}", chain.name, key, e));
                }
            }
            if let Some(quorum) = chain.quorum {
                if !quorum.is_valid() {
                    problems.push(format!(
                        "{}: quorum {}/{} must satisfy 0 < numerator <= denominator",
                        chain.name, quorum.numerator, quorum.denominator
                    ));
                }
            }
        }

        problems
    }
}
