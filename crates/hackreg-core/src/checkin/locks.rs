// # Record Locks
//
// Serializes redemptions of the same attendee record within this process.
//
// The record store offers no compare-and-set, so "read flag, then set flag"
// is only atomic if nobody else is doing the same thing for the same record
// at the same time. Keys are record ids, never ticket codes: ticket lookup
// matches substrings, so two different codes can name one record.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Per-key async mutexes, created on demand
#[derive(Debug, Default)]
pub struct RecordLocks {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

/// Held while a redemption is in progress
///
/// Dropping the guard releases the record and forgets the entry when no
/// other request is waiting on it.
pub struct RecordGuard<'a> {
    owner: &'a RecordLocks,
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl RecordLocks {
    /// Create an empty lock table
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `key`
    pub async fn acquire(&self, key: &str) -> RecordGuard<'_> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            Arc::clone(locks.entry(key.to_string()).or_default())
        };

        let guard = lock.lock_owned().await;
        RecordGuard {
            owner: self,
            key: key.to_string(),
            guard: Some(guard),
        }
    }

    /// Number of records with a live entry
    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    /// Whether no record is currently locked or awaited
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for RecordGuard<'_> {
    fn drop(&mut self) {
        // Release the mutex before checking whether anyone else holds the Arc.
        drop(self.guard.take());

        let mut locks = self
            .owner
            .locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(lock) = locks.get(&self.key)
            && Arc::strong_count(lock) == 1
        {
            locks.remove(&self.key);
        }
    }
}
