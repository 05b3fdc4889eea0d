//! Tests for transaction admission, ordering and execution
//!
//! The manager runs on top of a real test bridge; pricing uses a static
//! oracle with a zero base price unless stated otherwise, so the effective
//! price equals the priority fee.

use num_bigint::BigUint;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use cross_chain_bridge::bridge::{BridgeRequest, BridgeStatus};
use cross_chain_bridge::error::BridgeError;
use cross_chain_bridge::mempool::{
    ExecutionOutcome, GasPriceOracle, StaticGasOracle, Transaction, TransactionManager,
    TransactionPayload, TransactionStatus, UtilizationGasOracle,
};

#[path = "mod.rs"]
mod test_helpers;
use test_helpers::{
    build_env, eth, fast_options, TestEnv, DUMMY_RECIPIENT_SVM, DUMMY_SENDER_EVM, ETHEREUM, SOLANA,
};

const ALICE: &str = "0xalice";
const BOB: &str = "0xbob";

fn manager(env: &TestEnv, pool_size: usize) -> TransactionManager {
    manager_with_oracle(env, pool_size, Arc::new(StaticGasOracle::new(0, 10_000)))
}

fn manager_with_oracle(
    env: &TestEnv,
    pool_size: usize,
    oracle: Arc<dyn GasPriceOracle>,
) -> TransactionManager {
    TransactionManager::new(env.bridge.clone(), oracle, pool_size, 4)
}

fn transfer(sender: &str, amount: u32, fee: u128, nonce: u64) -> Transaction {
    Transaction::new(
        sender,
        TransactionPayload::Transfer {
            asset: eth(amount),
            recipient: BOB.to_string(),
        },
        fee,
        nonce,
    )
    .unwrap()
}

// ============================================================================
// ORDERING
// ============================================================================

/// Test that transactions leave the queue by descending effective price
/// What is tested: fees 10, 30, 20 dequeue as 30, 20, 10
/// Why: Higher-paying transactions execute first
#[tokio::test]
async fn test_queue_orders_by_effective_price() {
    let env = build_env(fast_options()).await;
    let manager = manager(&env, 10);

    for (nonce, fee) in [10u128, 30, 20].iter().enumerate() {
        manager
            .submit_transaction(transfer(ALICE, 1, *fee, nonce as u64))
            .await
            .unwrap();
    }

    let mut order = Vec::new();
    while let Some(entry) = manager.next_transaction().await {
        order.push(entry.effective_price);
    }
    assert_eq!(order, vec![30, 20, 10]);
}

/// Test that equal prices keep admission order
/// What is tested: three transactions with the same fee
/// Why: Ties are broken first-in, first-out
#[tokio::test]
async fn test_equal_prices_are_fifo() {
    let env = build_env(fast_options()).await;
    let manager = manager(&env, 10);

    let mut hashes = Vec::new();
    for nonce in 0..3u64 {
        hashes.push(
            manager
                .submit_transaction(transfer(ALICE, 1, 5, nonce))
                .await
                .unwrap(),
        );
    }

    let mut order = Vec::new();
    while let Some(entry) = manager.next_transaction().await {
        order.push(entry.tx.hash);
    }
    assert_eq!(order, hashes);
}

/// Test that the demand multiplier rises with pool occupancy
/// What is tested: two zero-fee transactions priced by a utilization oracle
/// Why: Later arrivals in a busy pool pay the higher demand price
#[tokio::test]
async fn test_utilization_oracle_prices_by_occupancy() {
    let env = build_env(fast_options()).await;
    let oracle = UtilizationGasOracle {
        base_price: 100,
        min_bps: 10_000,
        max_bps: 30_000,
    };
    let manager = manager_with_oracle(&env, 2, Arc::new(oracle));

    manager.submit_transaction(transfer(ALICE, 1, 0, 0)).await.unwrap();
    manager.submit_transaction(transfer(ALICE, 1, 0, 1)).await.unwrap();

    let first = manager.next_transaction().await.unwrap();
    let second = manager.next_transaction().await.unwrap();
    assert_eq!(first.effective_price, 200);
    assert_eq!(first.tx.nonce, 1);
    assert_eq!(second.effective_price, 100);
}

// ============================================================================
// ADMISSION
// ============================================================================

/// Test eviction in a full pool
/// What is tested: pool of 2 holding fees 10 and 15; fee 5 is refused, fee 20 evicts 10
/// Why: A full pool keeps the best-paying transactions
#[tokio::test]
async fn test_full_pool_evicts_cheapest() {
    let env = build_env(fast_options()).await;
    let manager = manager(&env, 2);

    let cheap = manager.submit_transaction(transfer(ALICE, 1, 10, 0)).await.unwrap();
    manager.submit_transaction(transfer(ALICE, 1, 15, 1)).await.unwrap();

    let refused = manager.submit_transaction(transfer(ALICE, 1, 5, 2)).await;
    assert_eq!(
        refused.unwrap_err(),
        BridgeError::MempoolFull {
            capacity: 2,
            lowest: 10,
            offered: 5
        }
    );

    let rich = manager.submit_transaction(transfer(ALICE, 1, 20, 2)).await.unwrap();
    assert_eq!(manager.status(&cheap).await, Some(TransactionStatus::Evicted));
    assert_eq!(manager.status(&rich).await, Some(TransactionStatus::Pending));
    assert_eq!(manager.pending_count().await, 2);

    let mut order = Vec::new();
    while let Some(entry) = manager.next_transaction().await {
        order.push(entry.effective_price);
    }
    assert_eq!(order, vec![20, 15]);
}

/// Test that a transaction hash is admitted only once
/// What is tested: the same transaction submitted twice
/// Why: Duplicate submissions must not execute twice
#[tokio::test]
async fn test_duplicate_transaction_rejected() {
    let env = build_env(fast_options()).await;
    let manager = manager(&env, 10);
    let tx = transfer(ALICE, 1, 5, 0);

    manager.submit_transaction(tx.clone()).await.unwrap();
    assert!(matches!(
        manager.submit_transaction(tx).await,
        Err(BridgeError::DuplicateTransaction(_))
    ));
}

/// Test that nonces below the sender's next nonce are rejected
/// What is tested: nonce 0 reused with a different fee
/// Why: Old nonces are replays of already admitted work
#[tokio::test]
async fn test_nonce_too_low_rejected() {
    let env = build_env(fast_options()).await;
    let manager = manager(&env, 10);

    manager.submit_transaction(transfer(ALICE, 1, 5, 0)).await.unwrap();
    assert_eq!(
        manager.submit_transaction(transfer(ALICE, 1, 50, 0)).await.unwrap_err(),
        BridgeError::NonceTooLow {
            expected: 1,
            actual: 0
        }
    );
    // Other senders are unaffected
    manager.submit_transaction(transfer(BOB, 1, 5, 0)).await.unwrap();
}

/// Test that malformed transactions are rejected before pricing
/// What is tested: tampered fee, mismatched bridge sender, zero transfer
/// Why: The hash binds the content; payload and sender must agree
#[tokio::test]
async fn test_malformed_transactions_rejected() {
    let env = build_env(fast_options()).await;
    let manager = manager(&env, 10);

    let mut tampered = transfer(ALICE, 1, 5, 0);
    tampered.max_priority_fee = 500;
    assert!(matches!(
        manager.submit_transaction(tampered).await,
        Err(BridgeError::InvalidTransaction(_))
    ));

    let request = BridgeRequest::new(ETHEREUM, SOLANA, DUMMY_SENDER_EVM, DUMMY_RECIPIENT_SVM, eth(1));
    let impersonated = Transaction::new(ALICE, TransactionPayload::Bridge(request), 5, 0).unwrap();
    assert!(matches!(
        manager.submit_transaction(impersonated).await,
        Err(BridgeError::InvalidTransaction(_))
    ));

    assert!(matches!(
        manager.submit_transaction(transfer(ALICE, 0, 5, 0)).await,
        Err(BridgeError::InvalidTransaction(_))
    ));
    assert_eq!(manager.pending_count().await, 0);
}

/// Test that an evicted transaction gives its nonce back
/// What is tested: pool of 1; each sender's nonce-0 transaction is evicted, then resubmitted with a higher fee
/// Why: A sender outbid out of the pool must be able to bid again for the same nonce
#[tokio::test]
async fn test_evicted_nonce_can_be_reused() {
    let env = build_env(fast_options()).await;
    let manager = manager(&env, 1);

    let outbid = transfer(ALICE, 1, 10, 0);
    let outbid_hash = manager.submit_transaction(outbid.clone()).await.unwrap();
    manager.submit_transaction(transfer(BOB, 1, 20, 0)).await.unwrap();
    assert_eq!(manager.status(&outbid_hash).await, Some(TransactionStatus::Evicted));

    let rebid = manager.submit_transaction(transfer(ALICE, 1, 30, 0)).await.unwrap();
    assert_eq!(manager.status(&rebid).await, Some(TransactionStatus::Pending));

    // The exact evicted transaction is still a duplicate
    assert!(matches!(
        manager.submit_transaction(outbid).await,
        Err(BridgeError::DuplicateTransaction(_))
    ));
    // Bob was outbid the same way and can bid again too
    manager.submit_transaction(transfer(BOB, 1, 40, 0)).await.unwrap();
    assert_eq!(manager.pending_count().await, 1);
}

// ============================================================================
// EXECUTION
// ============================================================================

/// Test that a bridge transaction is executed through the bridge
/// What is tested: execute_next on an admitted bridge transaction, with a subscriber
/// Why: The mempool is the entry point for bridge transfers
#[tokio::test]
async fn test_execute_bridge_transaction() {
    let env = build_env(fast_options()).await;
    env.fund(DUMMY_SENDER_EVM, &eth(100)).await;
    let manager = manager(&env, 10);
    let mut reports = manager.subscribe();

    let request = BridgeRequest::new(ETHEREUM, SOLANA, DUMMY_SENDER_EVM, DUMMY_RECIPIENT_SVM, eth(100));
    let hash = manager
        .submit_transaction(Transaction::new(DUMMY_SENDER_EVM, TransactionPayload::Bridge(request), 1, 0).unwrap())
        .await
        .unwrap();

    let report = manager.execute_next().await.unwrap();
    assert_eq!(report.tx_hash, hash);
    assert!(report.is_success());
    match &report.outcome {
        ExecutionOutcome::Bridged(result) => assert_eq!(result.status, BridgeStatus::Confirmed),
        other => panic!("expected Bridged, got {:?}", other),
    }
    assert_eq!(manager.status(&hash).await, Some(TransactionStatus::Executed));
    assert_eq!(reports.recv().await.unwrap().tx_hash, hash);
    assert!(manager.execute_next().await.is_none());
}

/// Test that execution failures are reported, not retried
/// What is tested: a transfer exceeding the sender's balance
/// Why: Failed transactions end in Failed and leave the queue
#[tokio::test]
async fn test_failed_execution_is_reported() {
    let env = build_env(fast_options()).await;
    env.fund(ALICE, &eth(1)).await;
    let manager = manager(&env, 10);

    let hash = manager.submit_transaction(transfer(ALICE, 5, 1, 0)).await.unwrap();
    let report = manager.execute_next().await.unwrap();

    assert!(!report.is_success());
    assert!(matches!(
        report.outcome,
        ExecutionOutcome::Failed(BridgeError::InsufficientBalance { .. })
    ));
    assert_eq!(manager.status(&hash).await, Some(TransactionStatus::Failed));
    assert_eq!(manager.pending_count().await, 0);
    assert_eq!(env.balance(ALICE, &eth(0)).await, BigUint::from(1u32));
}

/// Test the background executor
/// What is tested: run() executes admitted transfers and stops on shutdown
/// Why: The service drains the queue continuously
#[tokio::test]
async fn test_run_executes_until_shutdown() {
    let env = build_env(fast_options()).await;
    env.fund(ALICE, &eth(30)).await;
    let manager = Arc::new(manager(&env, 10));
    let mut reports = manager.subscribe();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let runner = tokio::spawn(manager.clone().run(shutdown_rx));

    for nonce in 0..3u64 {
        manager
            .submit_transaction(transfer(ALICE, 10, 1, nonce))
            .await
            .unwrap();
    }

    for _ in 0..3 {
        let report = tokio::time::timeout(Duration::from_secs(5), reports.recv())
            .await
            .expect("executor did not report in time")
            .unwrap();
        assert!(report.is_success());
    }
    assert_eq!(env.balance(BOB, &eth(0)).await, BigUint::from(30u32));

    shutdown_tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(5), runner)
        .await
        .expect("executor did not stop")
        .unwrap();
}

/// Test that terminal statuses are forgotten past the retention limit
/// What is tested: retention of 2 with three executed transfers, then resubmitting the oldest
/// Why: A long-running executor must not keep every status forever, and replay protection must survive pruning
#[tokio::test]
async fn test_terminal_statuses_are_pruned() {
    let env = build_env(fast_options()).await;
    env.fund(ALICE, &eth(3)).await;
    let manager = manager(&env, 10).with_status_retention(2);

    let first = transfer(ALICE, 1, 1, 0);
    let mut hashes = vec![manager.submit_transaction(first.clone()).await.unwrap()];
    for nonce in 1..3u64 {
        hashes.push(
            manager
                .submit_transaction(transfer(ALICE, 1, 1, nonce))
                .await
                .unwrap(),
        );
    }
    while manager.execute_next().await.is_some() {}

    assert_eq!(manager.status(&hashes[0]).await, None);
    assert_eq!(manager.status(&hashes[1]).await, Some(TransactionStatus::Executed));
    assert_eq!(manager.status(&hashes[2]).await, Some(TransactionStatus::Executed));
    assert_eq!(
        manager.submit_transaction(first).await.unwrap_err(),
        BridgeError::NonceTooLow {
            expected: 3,
            actual: 0
        }
    );
    assert_eq!(env.balance(BOB, &eth(0)).await, BigUint::from(3u32));
}
