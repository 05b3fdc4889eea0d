//! Transaction Admission Module
//!
//! This module admits, prices and orders the transactions that trigger
//! bridge transfers and plain transfers:
//!
//! - [`Mempool`] bounds how many admitted transactions may wait at once and
//!   evicts the cheapest one when a better-paying transaction arrives
//! - [`PriorityQueue`] orders waiting transactions by effective price
//! - [`TransactionManager`] validates, prices and admits transactions, and
//!   executes them in queue order

pub mod manager;
pub mod pricing;
pub mod queue;
pub mod transaction;

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};

use crate::error::{BridgeError, Result};

pub use manager::{ExecutionOutcome, ExecutionReport, TransactionManager, TransactionStatus};
pub use pricing::{effective_price, GasPriceOracle, StaticGasOracle, UtilizationGasOracle};
pub use queue::PriorityQueue;
pub use transaction::{PrioritizedTransaction, Transaction, TransactionPayload};

/// Bounded set of admitted transactions.
#[derive(Debug)]
pub struct Mempool {
    capacity: usize,
    entries: HashMap<String, PrioritizedTransaction>,
    /// (price, newest first) -> hash; the first entry is the eviction candidate
    by_price: BTreeMap<(u128, Reverse<u64>), String>,
}

impl Mempool {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: HashMap::new(),
            by_price: BTreeMap::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    pub fn contains(&self, hash: &str) -> bool {
        self.entries.contains_key(hash)
    }

    /// Lowest effective price currently held.
    pub fn lowest_price(&self) -> Option<u128> {
        self.by_price.keys().next().map(|(price, _)| *price)
    }

    /// Admits `entry`, evicting the lowest-priced occupant when full.
    ///
    /// Among occupants with the lowest price, the most recently admitted one
    /// is evicted.
    ///
    /// # Returns
    ///
    /// * `Ok(None)` - Admitted into free space
    /// * `Ok(Some(evicted))` - Admitted in place of `evicted`
    /// * `Err(BridgeError::MempoolFull)` - Full and the price does not beat the lowest
    pub fn admit(&mut self, entry: PrioritizedTransaction) -> Result<Option<PrioritizedTransaction>> {
        let mut evicted = None;
        if self.is_full() {
            let lowest = self.by_price.iter().next().map(|(key, hash)| (*key, hash.clone()));
            match lowest {
                Some(((price, _), hash)) if entry.effective_price > price => {
                    evicted = self.remove(&hash);
                }
                Some(((price, _), _)) => {
                    return Err(BridgeError::MempoolFull {
                        capacity: self.capacity,
                        lowest: price,
                        offered: entry.effective_price,
                    })
                }
                None => {
                    return Err(BridgeError::MempoolFull {
                        capacity: self.capacity,
                        lowest: 0,
                        offered: entry.effective_price,
                    })
                }
            }
        }
        self.by_price
            .insert((entry.effective_price, Reverse(entry.sequence)), entry.tx.hash.clone());
        self.entries.insert(entry.tx.hash.clone(), entry);
        Ok(evicted)
    }

    pub fn remove(&mut self, hash: &str) -> Option<PrioritizedTransaction> {
        let entry = self.entries.remove(hash)?;
        self.by_price
            .remove(&(entry.effective_price, Reverse(entry.sequence)));
        Some(entry)
    }
}
