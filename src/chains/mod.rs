//! Chain Adapter Module
//!
//! Every supported chain is reached through one [`BridgeAdapter`]. The
//! adapter knows the chain's address rules, which assets it can hold, how
//! foreign assets are represented on it, how to prove an escrow lock, and
//! how to mint/unlock on it.
//!
//! Adapters are created from configuration by an [`AdapterFactory`].
//! Creation can be slow or fail, so [`AdapterRegistry::initialize`] creates
//! all of them concurrently, each under its own timeout, and reports failures
//! per chain without holding back the chains that did come up.

pub mod evm;
pub mod generic;
pub mod ledger;
pub mod mvm;
pub mod svm;
pub mod utxo;

use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use crate::asset::Asset;
use crate::config::ChainConfig;
use crate::crypto::ValidatorSigner;
use crate::error::{BridgeError, Result};
use crate::proof::BridgeProof;
use crate::types::{Address, ChainId, ChainType, EscrowId, NetworkType, TokenStandard};
use crate::validator::Quorum;

pub use evm::EvmAdapter;
pub use generic::{AdapterCore, Attestor, LocalAttestor, SignatureCollector};
pub use ledger::{ChainLedger, LedgerSet};
pub use mvm::MvmAdapter;
pub use svm::SvmAdapter;
pub use utxo::UtxoAdapter;

// ============================================================================
// ADAPTER CAPABILITIES
// ============================================================================

/// Input for proof generation on the source chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofRequest {
    pub escrow_id: EscrowId,
    pub source_chain: ChainId,
    pub target_chain: ChainId,
    pub sender: Address,
    pub recipient: Address,
    /// Locked asset, carrying the locked amount
    pub asset: Asset,
    /// Sender nonce read from source chain state
    pub nonce: u64,
}

/// Result of a mint/unlock on the target chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    pub chain: ChainId,
    pub escrow_id: EscrowId,
    pub tx_hash: String,
    pub block_height: u64,
    /// Asset created for the recipient
    pub minted: Asset,
    pub submitted_at: u64,
}

/// Chain-specific bridge operations.
#[async_trait]
pub trait BridgeAdapter: Send + Sync {
    fn chain_id(&self) -> ChainId;

    fn chain_type(&self) -> ChainType;

    /// Checks that `address` is well-formed for this chain.
    fn validate_address(&self, address: &str) -> Result<()>;

    /// Whether this chain can custody `asset`.
    fn supports(&self, asset: &Asset) -> bool {
        asset.validate_for(self.chain_type()).is_ok()
    }

    /// Standard a foreign asset is represented as on this chain.
    fn target_standard(&self, asset: &Asset) -> TokenStandard;

    /// Representation of `asset` once bridged onto this chain.
    fn wrap_asset(&self, asset: &Asset) -> Asset {
        asset.wrapped_for(self.chain_id(), self.target_standard(asset))
    }

    /// Next nonce the chain expects from `sender`.
    async fn next_nonce(&self, sender: &str) -> Result<u64>;

    /// Proves the escrow lock described by `request`: commits the escrow
    /// leaf, waits for the block to finalize, and collects a validator quorum.
    async fn generate_proof(&self, request: &ProofRequest) -> Result<BridgeProof>;

    /// Mints or unlocks on this chain. Idempotent per escrow id.
    async fn submit(&self, proof: &BridgeProof) -> Result<TxReceipt>;
}

// ============================================================================
// ADAPTER FACTORY
// ============================================================================

/// Creates an adapter from a chain's configuration.
#[async_trait]
pub trait AdapterFactory: Send + Sync {
    async fn create(&self, chain: &ChainConfig) -> Result<Arc<dyn BridgeAdapter>>;
}

/// Builds ledger-backed adapters with local attestors.
pub struct LedgerAdapterFactory {
    ledgers: LedgerSet,
    network: NetworkType,
    default_quorum: Quorum,
}

impl LedgerAdapterFactory {
    pub fn new(ledgers: LedgerSet, network: NetworkType, default_quorum: Quorum) -> Self {
        Self {
            ledgers,
            network,
            default_quorum,
        }
    }
}

#[async_trait]
impl AdapterFactory for LedgerAdapterFactory {
    async fn create(&self, chain: &ChainConfig) -> Result<Arc<dyn BridgeAdapter>> {
        let chain_id = chain.chain();
        let endpoint = chain.endpoint(self.network).ok_or_else(|| {
            BridgeError::Configuration(format!(
                "{} ({}) has no {} endpoint",
                chain.name, chain_id, self.network
            ))
        })?;
        if chain.validator_set.is_empty() {
            return Err(BridgeError::Configuration(format!(
                "{} ({}) has an empty validator set",
                chain.name, chain_id
            )));
        }

        let mut attestors: Vec<Arc<dyn Attestor>> = Vec::new();
        for private_key in &chain.attestor_private_keys {
            let signer = ValidatorSigner::from_base64(private_key).map_err(|e| {
                BridgeError::Configuration(format!("{}: invalid attestor key: {}", chain.name, e))
            })?;
            if !chain.validator_set.contains(&signer.signer_id()) {
                return Err(BridgeError::Configuration(format!(
                    "{}: attestor {} is not in the validator set",
                    chain.name,
                    signer.signer_id()
                )));
            }
            attestors.push(Arc::new(LocalAttestor::new(signer)));
        }

        let ledger = self.ledgers.get(chain_id).ok_or_else(|| {
            BridgeError::Configuration(format!("no ledger for {} ({})", chain.name, chain_id))
        })?;
        let quorum = chain.quorum.unwrap_or(self.default_quorum);
        let required = quorum.required(chain.validator_set.len());
        let collector = SignatureCollector::new(attestors, required);
        let core = AdapterCore::new(chain_id, ledger, collector);

        info!(
            "Created {} adapter for {} ({}) at {}",
            chain.chain_type, chain.name, chain_id, endpoint.rpc_url
        );

        let adapter: Arc<dyn BridgeAdapter> = match chain.chain_type {
            ChainType::Evm => Arc::new(EvmAdapter::new(core)),
            ChainType::Mvm => Arc::new(MvmAdapter::new(core)),
            ChainType::Svm => Arc::new(SvmAdapter::new(core)),
            ChainType::Utxo => Arc::new(UtxoAdapter::new(core, self.network)),
        };
        Ok(adapter)
    }
}

// ============================================================================
// ADAPTER REGISTRY
// ============================================================================

/// A chain whose adapter could not be created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterInitFailure {
    pub chain: ChainId,
    pub name: String,
    pub error: BridgeError,
}

/// Adapters by chain id.
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    adapters: HashMap<ChainId, Arc<dyn BridgeAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the adapters for all `chains` concurrently.
    ///
    /// # Arguments
    ///
    /// * `chains` - Chain configurations
    /// * `factory` - Creates one adapter per chain
    /// * `timeout` - Upper bound for each adapter's creation
    ///
    /// # Returns
    ///
    /// The registry of adapters that came up, and one failure entry per chain
    /// that did not.
    pub async fn initialize(
        chains: &[ChainConfig],
        factory: &dyn AdapterFactory,
        timeout: Duration,
    ) -> (Self, Vec<AdapterInitFailure>) {
        let attempts = chains.iter().map(|chain| async move {
            let outcome = match tokio::time::timeout(timeout, factory.create(chain)).await {
                Ok(result) => result,
                Err(_) => Err(BridgeError::Configuration(format!(
                    "adapter creation timed out after {}ms",
                    timeout.as_millis()
                ))),
            };
            (chain, outcome)
        });

        let mut registry = Self::new();
        let mut failures = Vec::new();
        for (chain, outcome) in join_all(attempts).await {
            match outcome {
                Ok(adapter) => registry.register(adapter),
                Err(e) => {
                    error!("Failed to initialize {} ({}): {}", chain.name, chain.chain(), e);
                    failures.push(AdapterInitFailure {
                        chain: chain.chain(),
                        name: chain.name.clone(),
                        error: e,
                    });
                }
            }
        }
        (registry, failures)
    }

    pub fn register(&mut self, adapter: Arc<dyn BridgeAdapter>) {
        self.adapters.insert(adapter.chain_id(), adapter);
    }

    /// Adapter for `chain`, or `UnsupportedChain`.
    pub fn get(&self, chain: ChainId) -> Result<Arc<dyn BridgeAdapter>> {
        self.adapters
            .get(&chain)
            .cloned()
            .ok_or(BridgeError::UnsupportedChain(chain))
    }

    pub fn chains(&self) -> Vec<ChainId> {
        let mut chains: Vec<ChainId> = self.adapters.keys().copied().collect();
        chains.sort();
        chains
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}
