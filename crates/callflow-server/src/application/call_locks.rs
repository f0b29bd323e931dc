//! Per-call serialization
//!
//! Webhooks for one call are handled one at a time within this process;
//! different calls never wait on each other. Entries are dropped as soon as
//! nobody holds or waits for them.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Default)]
pub struct CallLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl CallLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `call_id`
    pub async fn lock(&self, call_id: &str) -> CallGuard<'_> {
        let lock = self.locks.entry(call_id.to_string()).or_default().clone();
        let guard = lock.lock_owned().await;
        CallGuard {
            locks: self,
            call_id: call_id.to_string(),
            guard: Some(guard),
        }
    }

    /// Number of calls currently locked or contended
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

pub struct CallGuard<'a> {
    locks: &'a CallLocks,
    call_id: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for CallGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Only the map's own reference left: no holder, no waiter
        self.locks
            .locks
            .remove_if(&self.call_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}
