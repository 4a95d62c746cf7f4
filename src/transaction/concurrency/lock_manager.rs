use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;

use crate::common::types::{PageId, TransactionId};
use crate::transaction::Aborted;

use super::page_lock::{LockMode, PageLock};

/// Default bound on any single lock wait. Elapsing it aborts the waiter.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_millis(500);

/// The fabric of per-page locks.
///
/// Owns the `PageId -> PageLock` map plus a reverse index of the pages each
/// transaction currently holds a lock on. The reverse index is a lookup
/// aid for `release_all`; the lock itself owns its holder sets.
pub struct LockManager {
    /// Locks are created lazily on first request and kept for the lifetime
    /// of the manager.
    locks: RwLock<HashMap<PageId, Arc<PageLock>>>,
    /// Pages on which a transaction holds any lock
    held_by: RwLock<HashMap<TransactionId, HashSet<PageId>>>,
    timeout: Duration,
}

impl Default for LockManager {
    fn default() -> Self {
        Self::new()
    }
}

impl LockManager {
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_LOCK_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            locks: RwLock::new(HashMap::new()),
            held_by: RwLock::new(HashMap::new()),
            timeout,
        }
    }

    /// Acquire `mode` on `pid` for `tid`, blocking until granted or until
    /// the lock-wait timeout elapses. On timeout nothing is released and
    /// the reverse index is untouched; the caller is expected to abort.
    pub fn acquire(&self, tid: TransactionId, pid: PageId, mode: LockMode) -> Result<(), Aborted> {
        let lock = self.lock_for(pid);
        match mode {
            LockMode::Shared => lock.acquire_shared(tid, self.timeout)?,
            LockMode::Exclusive => lock.acquire_exclusive(tid, self.timeout)?,
        }
        self.held_by.write().entry(tid).or_default().insert(pid);
        Ok(())
    }

    /// Release whatever `tid` holds on `pid`. Silent no-op if not held.
    pub fn release(&self, tid: TransactionId, pid: PageId) {
        let lock = self.locks.read().get(&pid).cloned();
        let Some(lock) = lock else {
            return;
        };
        lock.release(tid);

        let mut held_by = self.held_by.write();
        if let Some(pages) = held_by.get_mut(&tid) {
            pages.remove(&pid);
            if pages.is_empty() {
                held_by.remove(&tid);
            }
        }
    }

    /// Release every lock `tid` holds. Used by both commit and abort.
    pub fn release_all(&self, tid: TransactionId) {
        let pages = self.held_by.write().remove(&tid).unwrap_or_default();
        if pages.is_empty() {
            return;
        }
        let locks = self.locks.read();
        for pid in pages {
            if let Some(lock) = locks.get(&pid) {
                lock.release(tid);
            }
        }
    }

    /// The strongest mode `tid` holds on `pid`, if any. Never waits on the
    /// lock itself.
    pub fn holds(&self, tid: TransactionId, pid: PageId) -> Option<LockMode> {
        let lock = self.locks.read().get(&pid).cloned()?;
        lock.holds(tid)
    }

    /// Pages on which `tid` currently holds any lock.
    pub fn pages_held_by(&self, tid: TransactionId) -> Vec<PageId> {
        self.held_by
            .read()
            .get(&tid)
            .map(|pages| pages.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Locate the lock for `pid`, creating it if this is the first request.
    /// Creation under contention is resolved by re-checking under the write
    /// lock, so exactly one `PageLock` ever exists per page.
    fn lock_for(&self, pid: PageId) -> Arc<PageLock> {
        if let Some(lock) = self.locks.read().get(&pid) {
            return lock.clone();
        }
        let mut locks = self.locks.write();
        locks
            .entry(pid)
            .or_insert_with(|| Arc::new(PageLock::new(pid)))
            .clone()
    }
}
