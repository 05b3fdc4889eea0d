//! Unit tests for bridge result storage
//!
//! These tests verify result insertion, terminal-state protection and proof
//! replay tracking.

use num_bigint::BigUint;
use tokio_test::assert_ok;

use cross_chain_bridge::bridge::{AttemptState, BridgeResult, BridgeStatus};
use cross_chain_bridge::error::BridgeError;
use cross_chain_bridge::proof::{BridgeProof, MerklePath};
use cross_chain_bridge::storage::BridgeResultStore;

#[path = "mod.rs"]
mod test_helpers;
use test_helpers::{eth, DUMMY_RECIPIENT_SVM, DUMMY_SENDER_EVM, ETHEREUM, SOLANA};

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

fn create_test_result(escrow_id: &str) -> BridgeResult {
    BridgeResult {
        escrow_id: escrow_id.to_string(),
        source_chain: ETHEREUM,
        target_chain: SOLANA,
        sender: DUMMY_SENDER_EVM.to_string(),
        recipient: DUMMY_RECIPIENT_SVM.to_string(),
        proof: None,
        status: BridgeStatus::Pending,
        state: AttemptState::Locked,
        receipt: None,
        failure: None,
        submit_attempts: 0,
        created_at: 1,
        updated_at: 1,
    }
}

fn create_test_proof(escrow_id: &str, nonce: u64) -> BridgeProof {
    BridgeProof {
        escrow_id: escrow_id.to_string(),
        source_chain: ETHEREUM,
        target_chain: SOLANA,
        sender: DUMMY_SENDER_EVM.to_string(),
        recipient: DUMMY_RECIPIENT_SVM.to_string(),
        asset: eth(10),
        amount: BigUint::from(10u32),
        nonce,
        block_height: 1,
        merkle_path: MerklePath {
            leaf_index: 0,
            siblings: Vec::new(),
        },
        signatures: Vec::new(),
        timestamp: 1,
    }
}

// ============================================================================
// RESULT TESTS
// ============================================================================

/// Test that results can be stored, updated and listed
/// What is tested: insert, update, get, pending and len
/// Why: The bridge tracks every attempt through this store
#[tokio::test]
async fn test_insert_update_and_get() {
    let store = BridgeResultStore::new();
    store.insert(create_test_result("escrow-1")).await.unwrap();

    let updated = store
        .update("escrow-1", |result| {
            result.state = AttemptState::ProofGenerated;
            result.submit_attempts = 2;
        })
        .await
        .unwrap();

    assert_eq!(updated.state, AttemptState::ProofGenerated);
    assert!(updated.updated_at >= updated.created_at);
    let stored = store.get("escrow-1").await.unwrap();
    assert_eq!(stored.submit_attempts, 2);
    assert_eq!(store.pending().await.len(), 1);
    assert_eq!(store.len().await, 1);
    assert!(store.get("escrow-2").await.is_none());
}

/// Test that terminal results cannot change
/// What is tested: update and re-insert after a result is confirmed
/// Why: A confirmed transfer must never be rewritten
#[tokio::test]
async fn test_final_result_is_immutable() {
    let store = BridgeResultStore::new();
    store.insert(create_test_result("escrow-1")).await.unwrap();
    store
        .update("escrow-1", |result| {
            result.status = BridgeStatus::Confirmed;
            result.state = AttemptState::Released;
        })
        .await
        .unwrap();

    assert_eq!(
        store
            .update("escrow-1", |result| result.status = BridgeStatus::Failed)
            .await
            .unwrap_err(),
        BridgeError::ResultAlreadyFinal("escrow-1".to_string())
    );
    assert!(matches!(
        store.insert(create_test_result("escrow-1")).await,
        Err(BridgeError::ResultAlreadyFinal(_))
    ));
    assert_eq!(
        store.get("escrow-1").await.unwrap().status,
        BridgeStatus::Confirmed
    );
    assert!(store.pending().await.is_empty());
}

/// Test that updating an unknown result fails
/// Why: Updates to untracked escrows indicate a logic error upstream
#[tokio::test]
async fn test_update_unknown_result() {
    let store = BridgeResultStore::new();
    assert!(matches!(
        store.update("missing", |_| {}).await,
        Err(BridgeError::EscrowNotFound(_))
    ));
}

// ============================================================================
// REPLAY TESTS
// ============================================================================

/// Test that a proof can be claimed once
/// What is tested: claim_proof twice for the same escrow and nonce
/// Why: Replaying a proof would release funds twice
#[tokio::test]
async fn test_claim_proof_once() {
    let store = BridgeResultStore::new();
    let proof = create_test_proof("escrow-1", 0);

    assert!(!store.is_claimed(&proof).await);
    assert_ok!(store.claim_proof(&proof).await);
    assert!(store.is_claimed(&proof).await);
    assert_eq!(
        store.claim_proof(&proof).await.unwrap_err(),
        BridgeError::ReplayDetected {
            escrow_id: "escrow-1".to_string(),
            nonce: 0
        }
    );
}

/// Test that a sender nonce cannot be reused under a different escrow id
/// What is tested: second proof with a new escrow id but the same sender nonce
/// Why: Re-labelling a proof must not get around replay protection
#[tokio::test]
async fn test_sender_nonce_claimed_once() {
    let store = BridgeResultStore::new();
    store.claim_proof(&create_test_proof("escrow-1", 7)).await.unwrap();

    let relabelled = create_test_proof("escrow-2", 7);
    assert!(store.is_claimed(&relabelled).await);
    assert!(matches!(
        store.claim_proof(&relabelled).await,
        Err(BridgeError::ReplayDetected { .. })
    ));

    assert_ok!(store.claim_proof(&create_test_proof("escrow-2", 8)).await);
}
