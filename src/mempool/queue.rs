//! Priority queue of admitted transactions
//!
//! Entries dequeue by descending effective price; equal prices dequeue in
//! admission order.

use std::collections::BTreeMap;

use super::transaction::{PrioritizedTransaction, PriorityKey};

#[derive(Debug, Default)]
pub struct PriorityQueue {
    entries: BTreeMap<PriorityKey, PrioritizedTransaction>,
}

impl PriorityQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: PrioritizedTransaction) {
        self.entries.insert(entry.priority_key(), entry);
    }

    /// Removes and returns the highest-priority entry.
    pub fn pop(&mut self) -> Option<PrioritizedTransaction> {
        self.entries.pop_first().map(|(_, entry)| entry)
    }

    pub fn peek(&self) -> Option<&PrioritizedTransaction> {
        self.entries.values().next()
    }

    pub fn remove(&mut self, key: &PriorityKey) -> Option<PrioritizedTransaction> {
        self.entries.remove(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
