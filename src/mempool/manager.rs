//! Transaction Manager
//!
//! Admission happens under one `tokio::sync::Mutex` guarding the mempool,
//! the priority queue, the nonce tracker and the status map, so a
//! transaction is either fully admitted or not at all.
//!
//! Execution feeds dequeued transactions to the bridge (or to a plain escrow
//! transfer). Failures are reported to subscribers and never resubmitted.

use num_traits::Zero;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::{broadcast, watch, Mutex, Notify, Semaphore};
use tracing::{debug, error, info, warn};

use crate::bridge::{BridgeResult, CrossChainBridge};
use crate::error::{BridgeError, Result};
use crate::types::unix_now;

use super::pricing::{effective_price, GasPriceOracle};
use super::queue::PriorityQueue;
use super::transaction::{PrioritizedTransaction, Transaction, TransactionPayload};
use super::Mempool;

/// Capacity of the execution report channel; slow subscribers miss older reports.
const REPORT_CHANNEL_CAPACITY: usize = 256;
/// Terminal statuses kept for lookups before the oldest are forgotten.
const DEFAULT_STATUS_RETENTION: usize = 10_000;

// ============================================================================
// DATA STRUCTURES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TransactionStatus {
    /// Admitted and waiting in the queue (or executing)
    Pending,
    /// Executed successfully
    Executed,
    /// Execution failed
    Failed,
    /// Pushed out of the mempool by a better-paying transaction
    Evicted,
}

#[derive(Debug, Clone)]
pub enum ExecutionOutcome {
    Bridged(Box<BridgeResult>),
    Transferred,
    Failed(BridgeError),
}

/// Published for every executed transaction.
#[derive(Debug, Clone)]
pub struct ExecutionReport {
    pub tx_hash: String,
    pub sender: String,
    pub outcome: ExecutionOutcome,
    pub executed_at: u64,
}

impl ExecutionReport {
    pub fn is_success(&self) -> bool {
        !matches!(self.outcome, ExecutionOutcome::Failed(_))
    }
}

struct PoolState {
    mempool: Mempool,
    queue: PriorityQueue,
    /// Sender -> lowest acceptable next nonce
    nonces: HashMap<String, u64>,
    statuses: HashMap<String, TransactionStatus>,
    /// Hashes that reached a terminal status, oldest first
    finished: VecDeque<String>,
    status_retention: usize,
    next_sequence: u64,
}

impl PoolState {
    /// Records a terminal status and forgets the oldest ones past the retention limit.
    fn finish(&mut self, hash: String, status: TransactionStatus) {
        self.statuses.insert(hash.clone(), status);
        self.finished.push_back(hash);
        while self.finished.len() > self.status_retention {
            if let Some(oldest) = self.finished.pop_front() {
                self.statuses.remove(&oldest);
            }
        }
    }

    /// Gives an evicted transaction's nonce back when it was the sender's latest.
    fn release_nonce(&mut self, evicted: &Transaction) {
        let next = evicted.nonce.saturating_add(1);
        if let Some(expected) = self.nonces.get_mut(&evicted.sender) {
            if *expected == next {
                *expected = evicted.nonce;
            }
        }
    }
}

// ============================================================================
// TRANSACTION MANAGER
// ============================================================================

pub struct TransactionManager {
    bridge: Arc<CrossChainBridge>,
    oracle: Arc<dyn GasPriceOracle>,
    pool: Mutex<PoolState>,
    reports: broadcast::Sender<ExecutionReport>,
    admitted: Notify,
    batch_size: usize,
}

impl TransactionManager {
    pub fn new(
        bridge: Arc<CrossChainBridge>,
        oracle: Arc<dyn GasPriceOracle>,
        pool_size: usize,
        batch_size: usize,
    ) -> Self {
        let (reports, _) = broadcast::channel(REPORT_CHANNEL_CAPACITY);
        Self {
            bridge,
            oracle,
            pool: Mutex::new(PoolState {
                mempool: Mempool::new(pool_size),
                queue: PriorityQueue::new(),
                nonces: HashMap::new(),
                statuses: HashMap::new(),
                finished: VecDeque::new(),
                status_retention: DEFAULT_STATUS_RETENTION,
                next_sequence: 0,
            }),
            reports,
            admitted: Notify::new(),
            batch_size: batch_size.max(1),
        }
    }

    /// Number of terminal statuses remembered for [`status`](Self::status).
    /// Older ones are forgotten; their nonces stay consumed.
    pub fn with_status_retention(mut self, retention: usize) -> Self {
        self.pool.get_mut().status_retention = retention.max(1);
        self
    }

    /// Validates, prices and admits a transaction.
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - The transaction hash
    /// * `Err(BridgeError::InvalidTransaction)` - Malformed transaction or hash mismatch
    /// * `Err(BridgeError::DuplicateTransaction)` - Hash seen before
    /// * `Err(BridgeError::NonceTooLow)` - Nonce below the sender's next nonce
    /// * `Err(BridgeError::MempoolFull)` - Pool full and the price does not beat the lowest
    pub async fn submit_transaction(&self, tx: Transaction) -> Result<String> {
        Self::validate_structure(&tx)?;
        let base_price = self.oracle.base_price().await;

        let mut pool = self.pool.lock().await;
        if pool.statuses.contains_key(&tx.hash) {
            return Err(BridgeError::DuplicateTransaction(tx.hash.clone()));
        }
        let expected = pool.nonces.get(&tx.sender).copied().unwrap_or(0);
        if tx.nonce < expected {
            return Err(BridgeError::NonceTooLow {
                expected,
                actual: tx.nonce,
            });
        }

        let multiplier_bps = self
            .oracle
            .demand_multiplier_bps(pool.mempool.len(), pool.mempool.capacity())
            .await;
        let price = effective_price(base_price, multiplier_bps, tx.max_priority_fee);
        let entry = PrioritizedTransaction {
            tx,
            effective_price: price,
            sequence: pool.next_sequence,
            admitted_at: unix_now(),
        };

        if let Some(evicted) = pool.mempool.admit(entry.clone())? {
            pool.queue.remove(&evicted.priority_key());
            pool.release_nonce(&evicted.tx);
            pool.finish(evicted.tx.hash.clone(), TransactionStatus::Evicted);
            warn!(
                "Evicted transaction {} (price {}) for {} (price {})",
                evicted.tx.hash, evicted.effective_price, entry.tx.hash, price
            );
        }

        let hash = entry.tx.hash.clone();
        pool.next_sequence += 1;
        pool.nonces.insert(entry.tx.sender.clone(), entry.tx.nonce.saturating_add(1));
        pool.statuses.insert(hash.clone(), TransactionStatus::Pending);
        pool.queue.push(entry);
        drop(pool);

        self.admitted.notify_one();
        info!("Admitted transaction {} at effective price {}", hash, price);
        Ok(hash)
    }

    fn validate_structure(tx: &Transaction) -> Result<()> {
        if tx.sender.trim().is_empty() {
            return Err(BridgeError::InvalidTransaction("empty sender".to_string()));
        }
        let computed = tx.compute_hash()?;
        if computed != tx.hash {
            return Err(BridgeError::InvalidTransaction(format!(
                "hash {} does not match content hash {}",
                tx.hash, computed
            )));
        }
        match &tx.payload {
            TransactionPayload::Bridge(request) => {
                if request.sender != tx.sender {
                    return Err(BridgeError::InvalidTransaction(format!(
                        "bridge request sender {} differs from transaction sender {}",
                        request.sender, tx.sender
                    )));
                }
                if request.recipient.trim().is_empty() {
                    return Err(BridgeError::InvalidTransaction("empty recipient".to_string()));
                }
            }
            TransactionPayload::Transfer { asset, recipient } => {
                if recipient.trim().is_empty() {
                    return Err(BridgeError::InvalidTransaction("empty recipient".to_string()));
                }
                if asset.amount().is_zero() {
                    return Err(BridgeError::InvalidTransaction(
                        "transfer amount must be non-zero".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Removes the highest-priority transaction from the queue and the mempool.
    pub async fn next_transaction(&self) -> Option<PrioritizedTransaction> {
        let mut pool = self.pool.lock().await;
        let entry = pool.queue.pop()?;
        pool.mempool.remove(entry.hash());
        Some(entry)
    }

    /// Dequeues and executes one transaction. `None` when the queue is empty.
    pub async fn execute_next(&self) -> Option<ExecutionReport> {
        let entry = self.next_transaction().await?;
        Some(self.execute(entry).await)
    }

    async fn execute(&self, entry: PrioritizedTransaction) -> ExecutionReport {
        let tx = entry.tx;
        debug!("Executing transaction {} from {}", tx.hash, tx.sender);

        let outcome = match tx.payload {
            TransactionPayload::Bridge(request) => match self.bridge.bridge_asset(request).await {
                Ok(result) => ExecutionOutcome::Bridged(Box::new(result)),
                Err(e) => ExecutionOutcome::Failed(e),
            },
            TransactionPayload::Transfer { asset, recipient } => {
                match self.bridge.escrow().transfer(&tx.sender, &recipient, &asset).await {
                    Ok(()) => ExecutionOutcome::Transferred,
                    Err(e) => ExecutionOutcome::Failed(e),
                }
            }
        };

        let status = match &outcome {
            ExecutionOutcome::Failed(e) => {
                error!("Transaction {} failed: {}", tx.hash, e);
                TransactionStatus::Failed
            }
            _ => {
                info!("Transaction {} executed", tx.hash);
                TransactionStatus::Executed
            }
        };
        self.pool.lock().await.finish(tx.hash.clone(), status);

        let report = ExecutionReport {
            tx_hash: tx.hash,
            sender: tx.sender,
            outcome,
            executed_at: unix_now(),
        };
        // No subscribers is fine
        let _ = self.reports.send(report.clone());
        report
    }

    /// Receives a report for every transaction executed from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<ExecutionReport> {
        self.reports.subscribe()
    }

    pub async fn status(&self, tx_hash: &str) -> Option<TransactionStatus> {
        self.pool.lock().await.statuses.get(tx_hash).copied()
    }

    /// Number of admitted transactions waiting for execution.
    pub async fn pending_count(&self) -> usize {
        self.pool.lock().await.queue.len()
    }

    /// Executes queued transactions, up to `batch_size` at once, until
    /// `shutdown` turns true. In-flight executions finish before returning.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let permits = Arc::new(Semaphore::new(self.batch_size));
        info!("Transaction executor started (batch size {})", self.batch_size);

        loop {
            if *shutdown.borrow() {
                break;
            }
            let permit = tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
                permit = permits.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            match self.next_transaction().await {
                Some(entry) => {
                    let manager = self.clone();
                    tokio::spawn(async move {
                        manager.execute(entry).await;
                        drop(permit);
                    });
                }
                None => {
                    drop(permit);
                    tokio::select! {
                        _ = self.admitted.notified() => {}
                        changed = shutdown.changed() => {
                            if changed.is_err() {
                                break;
                            }
                        }
                    }
                }
            }
        }

        // Wait for in-flight executions
        let _ = permits.acquire_many(self.batch_size as u32).await;
        info!("Transaction executor stopped");
    }
}
