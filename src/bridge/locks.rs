//! Per-key exclusive sections
//!
//! Hands out one async mutex per key. An entry lives only while a guard or a
//! waiter holds it, so the map stays as large as the set of keys in use.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use tokio::sync::{Mutex, OwnedMutexGuard};

type Entries<K> = Arc<StdMutex<HashMap<K, Arc<Mutex<()>>>>>;

pub(crate) struct KeyedLocks<K: Eq + Hash + Clone> {
    entries: Entries<K>,
}

impl<K: Eq + Hash + Clone> KeyedLocks<K> {
    pub(crate) fn new() -> Self {
        Self {
            entries: Arc::new(StdMutex::new(HashMap::new())),
        }
    }

    /// Waits for exclusive access to `key`.
    pub(crate) async fn lock(&self, key: K) -> KeyedGuard<K> {
        // Built before waiting so a cancelled waiter still prunes its entry
        let mut held = KeyedGuard {
            guard: None,
            key,
            entries: self.entries.clone(),
        };
        let entry = {
            let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
            entries
                .entry(held.key.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        held.guard = Some(entry.lock_owned().await);
        held
    }

    /// Number of keys currently held or waited on.
    pub(crate) fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Exclusive access to one key; the entry is pruned on drop when nobody waits.
pub(crate) struct KeyedGuard<K: Eq + Hash + Clone> {
    guard: Option<OwnedMutexGuard<()>>,
    key: K,
    entries: Entries<K>,
}

impl<K: Eq + Hash + Clone> Drop for KeyedGuard<K> {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        // Only the map's own handle left: no holder, no waiter
        let idle = entries
            .get(&self.key)
            .map(|entry| Arc::strong_count(entry) == 1)
            .unwrap_or(false);
        if idle {
            entries.remove(&self.key);
        }
    }
}
