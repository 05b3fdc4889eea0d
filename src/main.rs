//! Cross-Chain Bridge Service
//!
//! Runs the bridge core as a service: adapters for every configured chain,
//! the proof validator, the escrow service, and the transaction executor
//! draining the priority queue into the bridge.
//!
//! ## Overview
//!
//! On startup the service:
//! 1. Initializes logging (`RUST_LOG` controls the filter)
//! 2. Loads configuration from `BRIDGE_CONFIG_PATH` (default `config/bridge.toml`)
//! 3. Creates every chain adapter concurrently, reporting chains that fail
//! 4. Runs the transaction executor until Ctrl-C

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use cross_chain_bridge::chains::{ChainLedger, LedgerAdapterFactory, LedgerSet};
use cross_chain_bridge::mempool::UtilizationGasOracle;
use cross_chain_bridge::validator::ChainTrust;
use cross_chain_bridge::{
    AdapterRegistry, BridgeResultStore, Config, CrossChainBridge, EscrowService, ProofValidator,
    TracingObserver, TransactionManager,
};

// ============================================================================
// MAIN APPLICATION ENTRY POINT
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting Cross-Chain Bridge Service");

    let config = Config::load()?;
    info!(
        "Configuration loaded: {} chains on {}",
        config.chains.len(),
        config.bridge.network_type
    );

    // Chain state and validator trust
    let mut ledgers = LedgerSet::new();
    for chain in &config.chains {
        ledgers.insert(Arc::new(ChainLedger::new(chain.chain(), chain.hash_scheme())));
    }

    let mut validator = ProofValidator::new(
        Arc::new(ledgers.clone()),
        config.validator.max_proof_age_secs,
        config.validator.max_clock_skew_secs,
    );
    for chain in &config.chains {
        let quorum = chain.quorum.unwrap_or(config.validator.quorum);
        let trust = ChainTrust::from_validator_set(&chain.validator_set, quorum, chain.hash_scheme())
            .with_context(|| format!("Invalid validator set for {}", chain.name))?;
        validator.add_chain(chain.chain(), trust);
    }

    // Adapters
    let factory = LedgerAdapterFactory::new(ledgers, config.bridge.network_type, config.validator.quorum);
    let (registry, failures) =
        AdapterRegistry::initialize(&config.chains, &factory, config.bridge.adapter_timeout()).await;
    for failure in &failures {
        warn!("Chain {} ({}) unavailable: {}", failure.name, failure.chain, failure.error);
    }
    if registry.is_empty() {
        anyhow::bail!("No chain adapter could be initialized");
    }
    info!("{} of {} chain adapters initialized", registry.len(), config.chains.len());

    // Bridge and executor
    let escrow = Arc::new(EscrowService::new(config.escrow.min_lock_amount.clone()));
    let bridge = Arc::new(
        CrossChainBridge::new(
            config.bridge.clone(),
            escrow,
            registry,
            Arc::new(validator),
            Arc::new(BridgeResultStore::new()),
        )
        .with_observer(Arc::new(TracingObserver)),
    );
    let manager = Arc::new(TransactionManager::new(
        bridge,
        Arc::new(UtilizationGasOracle::from_config(&config.mempool)),
        config.mempool.pool_size,
        config.bridge.batch_size,
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let executor = tokio::spawn(manager.run(shutdown_rx));

    tokio::signal::ctrl_c().await.context("Failed to listen for Ctrl-C")?;
    info!("Shutdown requested");
    if shutdown_tx.send(true).is_err() {
        error!("Transaction executor already stopped");
    }
    executor.await.context("Transaction executor panicked")?;

    Ok(())
}
