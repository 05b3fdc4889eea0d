//! In-memory chain ledger
//!
//! Chain state as seen by the bridge: per-sender nonces, blocks of escrow
//! leaves with their merkle roots, the finalized height, and the log of
//! target-side mints. Adapters read and write chain state only through this
//! type, so an RPC-backed reader can take its place.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::asset::Asset;
use crate::crypto::HashScheme;
use crate::error::{BridgeError, Result};
use crate::proof::{MerklePath, MerkleTree};
use crate::types::{unix_now, ChainId, Digest, EscrowId};
use crate::validator::FinalizedRoots;

use super::TxReceipt;

#[derive(Debug, Default)]
struct LedgerState {
    /// Sender -> next expected nonce
    nonces: HashMap<String, u64>,
    /// Height of the block currently accepting leaves
    open_height: u64,
    open_leaves: Vec<Digest>,
    /// Sealed (finalized) blocks by height
    sealed: BTreeMap<u64, MerkleTree>,
    /// Escrow id -> receipt of the mint on this chain
    minted: HashMap<EscrowId, TxReceipt>,
}

/// State of one chain.
#[derive(Debug)]
pub struct ChainLedger {
    chain: ChainId,
    scheme: HashScheme,
    state: RwLock<LedgerState>,
}

impl ChainLedger {
    pub fn new(chain: ChainId, scheme: HashScheme) -> Self {
        Self {
            chain,
            scheme,
            state: RwLock::new(LedgerState {
                open_height: 1,
                ..LedgerState::default()
            }),
        }
    }

    pub fn chain(&self) -> ChainId {
        self.chain
    }

    pub fn hash_scheme(&self) -> HashScheme {
        self.scheme
    }

    // ------------------------------ NONCES ------------------------------

    /// Next nonce the chain expects from `sender`.
    pub async fn next_nonce(&self, sender: &str) -> u64 {
        self.state.read().await.nonces.get(sender).copied().unwrap_or(0)
    }

    /// Consumes `nonce` for `sender`. Anything but the expected nonce is a replay.
    pub async fn consume_nonce(&self, sender: &str, escrow_id: &str, nonce: u64) -> Result<()> {
        let mut state = self.state.write().await;
        let expected = state.nonces.get(sender).copied().unwrap_or(0);
        if nonce != expected {
            return Err(BridgeError::ReplayDetected {
                escrow_id: escrow_id.to_string(),
                nonce,
            });
        }
        state.nonces.insert(sender.to_string(), expected + 1);
        Ok(())
    }

    // ------------------------------ BLOCKS ------------------------------

    /// Appends a leaf to the open block. Returns `(block height, leaf index)`.
    pub async fn include(&self, leaf: Digest) -> (u64, u64) {
        let mut state = self.state.write().await;
        state.open_leaves.push(leaf);
        (state.open_height, (state.open_leaves.len() - 1) as u64)
    }

    /// Seals the open block if its height is at most `height`, making every
    /// block up to `height` final. Returns the root of block `height`.
    pub async fn seal_through(&self, height: u64) -> Result<Digest> {
        let mut state = self.state.write().await;
        if state.open_height <= height && !state.open_leaves.is_empty() {
            let leaves = std::mem::take(&mut state.open_leaves);
            let sealed_height = state.open_height;
            let tree = MerkleTree::new(self.scheme, leaves);
            debug!(
                "{} sealed block {} with {} leaves",
                self.chain,
                sealed_height,
                tree.leaf_count()
            );
            state.sealed.insert(sealed_height, tree);
            state.open_height += 1;
        }
        state
            .sealed
            .get(&height)
            .map(MerkleTree::root)
            .ok_or_else(|| {
                BridgeError::ProofGenerationFailed(format!(
                    "block {} on {} is not sealed",
                    height, self.chain
                ))
            })
    }

    /// Inclusion path of a leaf in a sealed block.
    pub async fn path(&self, height: u64, leaf_index: u64) -> Result<MerklePath> {
        let state = self.state.read().await;
        state
            .sealed
            .get(&height)
            .and_then(|tree| tree.path(leaf_index as usize))
            .ok_or_else(|| {
                BridgeError::ProofGenerationFailed(format!(
                    "no leaf {} in sealed block {} on {}",
                    leaf_index, height, self.chain
                ))
            })
    }

    pub async fn finalized_root(&self, height: u64) -> Option<Digest> {
        self.state.read().await.sealed.get(&height).map(MerkleTree::root)
    }

    /// Highest sealed block height, zero before the first seal.
    pub async fn finalized_height(&self) -> u64 {
        self.state
            .read()
            .await
            .sealed
            .keys()
            .next_back()
            .copied()
            .unwrap_or(0)
    }

    // ------------------------------ MINTS -------------------------------

    /// Records the mint for `escrow_id`. A repeated mint returns the first receipt.
    pub async fn record_mint(&self, escrow_id: &str, minted: Asset) -> TxReceipt {
        let mut state = self.state.write().await;
        if let Some(receipt) = state.minted.get(escrow_id) {
            debug!("{} already minted escrow {}", self.chain, escrow_id);
            return receipt.clone();
        }
        let chain_bytes = self.chain.0.to_be_bytes();
        let tx_hash = self.scheme.digest(&[b"mint", &chain_bytes, escrow_id.as_bytes()]);
        let receipt = TxReceipt {
            chain: self.chain,
            escrow_id: escrow_id.to_string(),
            tx_hash: format!("0x{}", hex::encode(tx_hash)),
            block_height: state.open_height,
            minted,
            submitted_at: unix_now(),
        };
        state.minted.insert(escrow_id.to_string(), receipt.clone());
        receipt
    }

    pub async fn receipt(&self, escrow_id: &str) -> Option<TxReceipt> {
        self.state.read().await.minted.get(escrow_id).cloned()
    }
}

/// The ledgers of every configured chain, serving finalized roots to the validator.
#[derive(Debug, Default, Clone)]
pub struct LedgerSet {
    ledgers: HashMap<ChainId, Arc<ChainLedger>>,
}

impl LedgerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, ledger: Arc<ChainLedger>) {
        self.ledgers.insert(ledger.chain(), ledger);
    }

    pub fn get(&self, chain: ChainId) -> Option<Arc<ChainLedger>> {
        self.ledgers.get(&chain).cloned()
    }
}

#[async_trait]
impl FinalizedRoots for LedgerSet {
    async fn finalized_root(&self, chain: ChainId, height: u64) -> Option<Digest> {
        match self.ledgers.get(&chain) {
            Some(ledger) => ledger.finalized_root(height).await,
            None => None,
        }
    }
}
