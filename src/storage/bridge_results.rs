//! Bridge Result Storage Module
//!
//! This module stores the result of every bridge attempt, keyed by escrow id,
//! and the set of consumed proofs. A result starts `Pending` and moves once
//! to `Confirmed` or `Failed`; terminal results are never modified again.
//!
//! A proof is consumed by [`BridgeResultStore::claim_proof`]. Claiming fails
//! with `ReplayDetected` when the same `(escrow_id, nonce)` pair, or the same
//! `(source chain, sender, nonce)` triple, was claimed before.

use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::bridge::{BridgeResult, BridgeStatus};
use crate::error::{BridgeError, Result};
use crate::proof::BridgeProof;
use crate::types::{unix_now, Address, ChainId, EscrowId};

// ============================================================================
// STORAGE IMPLEMENTATION
// ============================================================================

#[derive(Default)]
struct StoreState {
    /// Map of escrow_id -> BridgeResult
    results: HashMap<EscrowId, BridgeResult>,
    /// Consumed (escrow_id, nonce) pairs
    consumed: HashSet<(EscrowId, u64)>,
    /// Consumed (source chain, sender, nonce) triples
    sender_nonces: HashSet<(ChainId, Address, u64)>,
}

/// In-memory storage for bridge results.
///
/// Uses HashMap for O(1) lookup by escrow_id. Thread-safe via RwLock; the
/// replay sets live under the same lock so a claim is atomic.
pub struct BridgeResultStore {
    state: RwLock<StoreState>,
}

impl BridgeResultStore {
    /// Create a new bridge result store.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(StoreState::default()),
        }
    }

    /// Inserts a new result.
    ///
    /// # Returns
    ///
    /// * `Ok(())` if stored
    /// * `Err(BridgeError::ResultAlreadyFinal)` if a terminal result exists for the escrow
    pub async fn insert(&self, result: BridgeResult) -> Result<()> {
        let mut state = self.state.write().await;
        if let Some(existing) = state.results.get(&result.escrow_id) {
            if existing.status.is_final() {
                return Err(BridgeError::ResultAlreadyFinal(result.escrow_id.clone()));
            }
        }
        debug!("Stored bridge result for escrow {}", result.escrow_id);
        state.results.insert(result.escrow_id.clone(), result);
        Ok(())
    }

    /// Applies `change` to a non-terminal result and returns the updated copy.
    ///
    /// # Returns
    ///
    /// * `Ok(BridgeResult)` - The result after the change
    /// * `Err(BridgeError::EscrowNotFound)` - No result for the escrow
    /// * `Err(BridgeError::ResultAlreadyFinal)` - The result is `Confirmed` or `Failed`
    pub async fn update<F>(&self, escrow_id: &str, change: F) -> Result<BridgeResult>
    where
        F: FnOnce(&mut BridgeResult),
    {
        let mut state = self.state.write().await;
        let result = state
            .results
            .get_mut(escrow_id)
            .ok_or_else(|| BridgeError::EscrowNotFound(escrow_id.to_string()))?;
        if result.status.is_final() {
            warn!("Refusing to modify final bridge result for escrow {}", escrow_id);
            return Err(BridgeError::ResultAlreadyFinal(escrow_id.to_string()));
        }
        change(result);
        result.updated_at = unix_now();
        Ok(result.clone())
    }

    /// Get a bridge result by escrow id.
    pub async fn get(&self, escrow_id: &str) -> Option<BridgeResult> {
        self.state.read().await.results.get(escrow_id).cloned()
    }

    /// All results still `Pending`.
    pub async fn pending(&self) -> Vec<BridgeResult> {
        self.state
            .read()
            .await
            .results
            .values()
            .filter(|result| result.status == BridgeStatus::Pending)
            .cloned()
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.results.len()
    }

    /// Whether the proof's escrow/nonce pair or sender nonce was already claimed.
    pub async fn is_claimed(&self, proof: &BridgeProof) -> bool {
        let state = self.state.read().await;
        state.consumed.contains(&(proof.escrow_id.clone(), proof.nonce))
            || state
                .sender_nonces
                .contains(&(proof.source_chain, proof.sender.clone(), proof.nonce))
    }

    /// Marks a proof as consumed.
    ///
    /// # Returns
    ///
    /// * `Ok(())` if this is the first claim
    /// * `Err(BridgeError::ReplayDetected)` if the proof (or its sender nonce) was claimed before
    pub async fn claim_proof(&self, proof: &BridgeProof) -> Result<()> {
        let mut state = self.state.write().await;
        let pair = (proof.escrow_id.clone(), proof.nonce);
        let triple = (proof.source_chain, proof.sender.clone(), proof.nonce);
        if state.consumed.contains(&pair) || state.sender_nonces.contains(&triple) {
            warn!(
                "Replay of escrow {} nonce {} from {} rejected",
                proof.escrow_id, proof.nonce, proof.sender
            );
            return Err(BridgeError::ReplayDetected {
                escrow_id: proof.escrow_id.clone(),
                nonce: proof.nonce,
            });
        }
        state.consumed.insert(pair);
        state.sender_nonces.insert(triple);
        Ok(())
    }
}

impl Default for BridgeResultStore {
    fn default() -> Self {
        Self::new()
    }
}
