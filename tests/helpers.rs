//! Shared test fixtures
//!
//! Builds a complete in-process bridge over four ledger-backed chains with
//! deterministic validator keys, plus adapter wrappers that inject delays and
//! failures.

use async_trait::async_trait;
use num_bigint::BigUint;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

use cross_chain_bridge::asset::Asset;
use cross_chain_bridge::bridge::{BridgeEvent, BridgeObserver, CrossChainBridge};
use cross_chain_bridge::chains::{
    AdapterRegistry, BridgeAdapter, ChainLedger, LedgerAdapterFactory, LedgerSet, ProofRequest,
    TxReceipt,
};
use cross_chain_bridge::config::{BridgeOptions, ChainConfig, Config, NetworkEndpoint};
use cross_chain_bridge::crypto::ValidatorSigner;
use cross_chain_bridge::error::{BridgeError, Result};
use cross_chain_bridge::escrow::EscrowService;
use cross_chain_bridge::proof::BridgeProof;
use cross_chain_bridge::storage::BridgeResultStore;
use cross_chain_bridge::types::{ChainId, ChainType, NetworkType, TokenStandard};
use cross_chain_bridge::validator::{ChainTrust, ProofValidator};

// ============================================================================
// CHAINS AND ADDRESSES
// ============================================================================

pub const ETHEREUM: ChainId = ChainId(1);
pub const SOLANA: ChainId = ChainId(2);
pub const BITCOIN: ChainId = ChainId(3);
pub const APTOS: ChainId = ChainId(4);

pub const DUMMY_SENDER_EVM: &str = "0x00000000000000000000000000000000000000a1";
pub const DUMMY_RECIPIENT_EVM: &str = "0x00000000000000000000000000000000000000b2";
pub const DUMMY_SENDER_SVM: &str =
    "0x00000000000000000000000000000000000000000000000000000000000000c3";
pub const DUMMY_RECIPIENT_SVM: &str =
    "0x00000000000000000000000000000000000000000000000000000000000000d4";
pub const DUMMY_RECIPIENT_MVM: &str =
    "0x00000000000000000000000000000000000000000000000000000000000000e5";
pub const DUMMY_SENDER_BTC: &str = "tb1qw508d6qejxtdg4y5r3zarvary0c5xw7kxpjzsx";

/// Seeds of the deterministic validator keys shared by every test chain.
pub const VALIDATOR_SEEDS: [u8; 3] = [11, 12, 13];

pub fn validator_signers() -> Vec<ValidatorSigner> {
    VALIDATOR_SEEDS
        .iter()
        .map(|seed| ValidatorSigner::from_bytes(&[*seed; 32]))
        .collect()
}

pub fn eth(amount: u32) -> Asset {
    Asset::native(ETHEREUM, "ETH", amount)
}

pub fn btc(amount: u32) -> Asset {
    Asset::native(BITCOIN, "BTC", amount)
}

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Builds a chain entry with a testnet endpoint and the shared validator set.
pub fn build_chain_config(name: &str, chain_id: u64, chain_type: ChainType) -> ChainConfig {
    let signers = validator_signers();
    ChainConfig {
        name: name.to_string(),
        chain_id,
        chain_type,
        hash_scheme: None,
        mainnet: None,
        testnet: Some(NetworkEndpoint {
            rpc_url: format!("http://127.0.0.1:{}", 8540 + chain_id),
            bridge_contract: format!("{}-bridge", name.to_lowercase()),
            api_key: None,
        }),
        validator_set: signers.iter().map(ValidatorSigner::signer_id).collect(),
        quorum: None,
        attestor_private_keys: signers.iter().map(ValidatorSigner::private_key_base64).collect(),
    }
}

/// Build a valid test configuration with Ethereum, Solana, Bitcoin and Aptos.
pub fn build_test_config() -> Config {
    let mut config = Config::default();
    config.bridge = fast_options();
    config.chains = vec![
        build_chain_config("Ethereum", 1, ChainType::Evm),
        build_chain_config("Solana", 2, ChainType::Svm),
        build_chain_config("Bitcoin", 3, ChainType::Utxo),
        build_chain_config("Aptos", 4, ChainType::Mvm),
    ];
    config
}

/// Bridge options with short timeouts and backoff.
pub fn fast_options() -> BridgeOptions {
    BridgeOptions {
        timeout_ms: 5_000,
        proof_timeout_ms: 5_000,
        submission_timeout_ms: 5_000,
        retry_attempts: 3,
        retry_backoff_ms: 1,
        batch_size: 10,
        network_type: NetworkType::Testnet,
    }
}

// ============================================================================
// BRIDGE ENVIRONMENT
// ============================================================================

/// Records every bridge event.
#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<BridgeEvent>>,
}

impl RecordingObserver {
    pub fn names(&self) -> Vec<&'static str> {
        self.events.lock().unwrap().iter().map(BridgeEvent::name).collect()
    }

    pub fn events(&self) -> Vec<BridgeEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl BridgeObserver for RecordingObserver {
    fn on_event(&self, event: &BridgeEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

pub struct TestEnv {
    pub config: Config,
    pub bridge: Arc<CrossChainBridge>,
    pub escrow: Arc<EscrowService>,
    pub ledgers: LedgerSet,
    pub validator: Arc<ProofValidator>,
    pub results: Arc<BridgeResultStore>,
    pub events: Arc<RecordingObserver>,
}

impl TestEnv {
    pub fn ledger(&self, chain: ChainId) -> Arc<ChainLedger> {
        self.ledgers.get(chain).unwrap()
    }

    /// Credits `asset` to `owner` in the escrow balance book.
    pub async fn fund(&self, owner: &str, asset: &Asset) {
        self.escrow.deposit(owner, asset).await.unwrap();
    }

    pub async fn balance(&self, owner: &str, asset: &Asset) -> BigUint {
        self.escrow.balance_of(owner, &asset.key()).await
    }
}

pub fn build_ledgers(config: &Config) -> LedgerSet {
    let mut ledgers = LedgerSet::new();
    for chain in &config.chains {
        ledgers.insert(Arc::new(ChainLedger::new(chain.chain(), chain.hash_scheme())));
    }
    ledgers
}

pub fn build_validator(config: &Config, ledgers: &LedgerSet) -> ProofValidator {
    let mut validator = ProofValidator::new(
        Arc::new(ledgers.clone()),
        config.validator.max_proof_age_secs,
        config.validator.max_clock_skew_secs,
    );
    for chain in &config.chains {
        let trust = ChainTrust::from_validator_set(
            &chain.validator_set,
            chain.quorum.unwrap_or(config.validator.quorum),
            chain.hash_scheme(),
        )
        .unwrap();
        validator.add_chain(chain.chain(), trust);
    }
    validator
}

pub async fn build_env(options: BridgeOptions) -> TestEnv {
    build_env_with(options, |_, _, _| Vec::new()).await
}

/// Builds the environment, letting `overrides` replace adapters in the
/// registry before the bridge is created.
pub async fn build_env_with<F>(options: BridgeOptions, overrides: F) -> TestEnv
where
    F: FnOnce(&AdapterRegistry, &Arc<EscrowService>, &Arc<BridgeResultStore>) -> Vec<Arc<dyn BridgeAdapter>>,
{
    let mut config = build_test_config();
    config.bridge = options.clone();
    let ledgers = build_ledgers(&config);
    let validator = Arc::new(build_validator(&config, &ledgers));

    let factory = LedgerAdapterFactory::new(ledgers.clone(), NetworkType::Testnet, config.validator.quorum);
    let (mut registry, failures) =
        AdapterRegistry::initialize(&config.chains, &factory, Duration::from_secs(5)).await;
    assert!(failures.is_empty(), "adapter init failed: {:?}", failures);

    let escrow = Arc::new(EscrowService::new(BigUint::from(1u32)));
    let results = Arc::new(BridgeResultStore::new());
    for adapter in overrides(&registry, &escrow, &results) {
        registry.register(adapter);
    }

    let events = Arc::new(RecordingObserver::default());
    let bridge = CrossChainBridge::new(
        options,
        escrow.clone(),
        registry,
        validator.clone(),
        results.clone(),
    )
    .with_observer(events.clone());

    TestEnv {
        config,
        bridge: Arc::new(bridge),
        escrow,
        ledgers,
        validator,
        results,
        events,
    }
}

// ============================================================================
// SCRIPTED ADAPTER
// ============================================================================

/// Wraps a real adapter and injects delays or failures.
pub struct ScriptedAdapter {
    inner: Arc<dyn BridgeAdapter>,
    submit_failures: AtomicU32,
    submit_calls: AtomicU32,
    proof_delay: Option<Duration>,
    submit_delay: Option<Duration>,
    release_before_failing: Option<Arc<EscrowService>>,
    proof_tap: Option<mpsc::UnboundedSender<BridgeProof>>,
    claim_first: Option<Arc<BridgeResultStore>>,
}

impl ScriptedAdapter {
    pub fn wrap(inner: Arc<dyn BridgeAdapter>) -> Self {
        Self {
            inner,
            submit_failures: AtomicU32::new(0),
            submit_calls: AtomicU32::new(0),
            proof_delay: None,
            submit_delay: None,
            release_before_failing: None,
            proof_tap: None,
            claim_first: None,
        }
    }

    /// The next `count` submissions fail.
    pub fn failing_submissions(self, count: u32) -> Self {
        self.submit_failures.store(count, Ordering::SeqCst);
        self
    }

    /// Proof generation sleeps for `delay` first.
    pub fn with_proof_delay(mut self, delay: Duration) -> Self {
        self.proof_delay = Some(delay);
        self
    }

    /// Submission sleeps for `delay` first.
    pub fn with_submit_delay(mut self, delay: Duration) -> Self {
        self.submit_delay = Some(delay);
        self
    }

    /// Every generated proof is also sent to `tap`.
    pub fn tapping_proofs(mut self, tap: mpsc::UnboundedSender<BridgeProof>) -> Self {
        self.proof_tap = Some(tap);
        self
    }

    /// Every generated proof is claimed in `results` before it is returned.
    pub fn claiming_proofs_first(mut self, results: Arc<BridgeResultStore>) -> Self {
        self.claim_first = Some(results);
        self
    }

    /// Proof generation settles the escrow itself and then fails, leaving
    /// nothing to refund.
    pub fn releasing_before_failure(mut self, escrow: Arc<EscrowService>) -> Self {
        self.release_before_failing = Some(escrow);
        self
    }

    pub fn submit_calls(&self) -> u32 {
        self.submit_calls.load(Ordering::SeqCst)
    }

    pub fn allow_submissions(&self) {
        self.submit_failures.store(0, Ordering::SeqCst);
    }
}

#[async_trait]
impl BridgeAdapter for ScriptedAdapter {
    fn chain_id(&self) -> ChainId {
        self.inner.chain_id()
    }

    fn chain_type(&self) -> ChainType {
        self.inner.chain_type()
    }

    fn validate_address(&self, address: &str) -> Result<()> {
        self.inner.validate_address(address)
    }

    fn target_standard(&self, asset: &Asset) -> TokenStandard {
        self.inner.target_standard(asset)
    }

    async fn next_nonce(&self, sender: &str) -> Result<u64> {
        self.inner.next_nonce(sender).await
    }

    async fn generate_proof(&self, request: &ProofRequest) -> Result<BridgeProof> {
        if let Some(delay) = self.proof_delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(escrow) = &self.release_before_failing {
            escrow
                .release(&request.escrow_id, &request.recipient, &request.asset)
                .await?;
            return Err(BridgeError::ProofGenerationFailed("source chain reorg".to_string()));
        }
        let proof = self.inner.generate_proof(request).await?;
        if let Some(tap) = &self.proof_tap {
            let _ = tap.send(proof.clone());
        }
        if let Some(results) = &self.claim_first {
            results.claim_proof(&proof).await?;
        }
        Ok(proof)
    }

    async fn submit(&self, proof: &BridgeProof) -> Result<TxReceipt> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.submit_delay {
            tokio::time::sleep(delay).await;
        }
        let failed = self
            .submit_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if failed {
            return Err(BridgeError::SubmissionFailed {
                chain: self.chain_id(),
                reason: "rpc unavailable".to_string(),
            });
        }
        self.inner.submit(proof).await
    }
}
