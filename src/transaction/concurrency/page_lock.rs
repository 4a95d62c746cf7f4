use std::collections::HashSet;
use std::time::{Duration, Instant};

use log::warn;
use parking_lot::{Condvar, Mutex};

use crate::common::types::{PageId, TransactionId};
use crate::transaction::Aborted;

/// Lock modes a transaction can request on a page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockMode {
    Shared,
    Exclusive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LockStatus {
    Free,
    Shared,
    Exclusive,
}

struct LockState {
    status: LockStatus,
    shared_holders: HashSet<TransactionId>,
    exclusive_holder: Option<TransactionId>,
}

/// A shared/exclusive lock guarding one page.
///
/// Grant decisions are made under the internal mutex; blocked requests wait
/// on the condition variable and re-check the grant predicate on every wake.
/// Every wait is bounded: a request that cannot be granted before its
/// deadline fails with [`Aborted`], which is the deadlock-resolution
/// mechanism — cycles are not detected, they are timed out.
pub struct PageLock {
    page_id: PageId,
    state: Mutex<LockState>,
    waiters: Condvar,
}

impl PageLock {
    pub fn new(page_id: PageId) -> Self {
        Self {
            page_id,
            state: Mutex::new(LockState {
                status: LockStatus::Free,
                shared_holders: HashSet::new(),
                exclusive_holder: None,
            }),
            waiters: Condvar::new(),
        }
    }

    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    /// Acquire the lock in shared mode.
    ///
    /// Granted immediately when the lock is free, already shared, or held
    /// exclusively by `tid` itself (the exclusive holder implicitly holds
    /// shared). Otherwise waits until the exclusive holder releases or the
    /// deadline elapses.
    pub fn acquire_shared(&self, tid: TransactionId, timeout: Duration) -> Result<(), Aborted> {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        loop {
            match state.status {
                LockStatus::Free => {
                    state.shared_holders.insert(tid);
                    state.status = LockStatus::Shared;
                    return Ok(());
                }
                LockStatus::Shared => {
                    state.shared_holders.insert(tid);
                    return Ok(());
                }
                LockStatus::Exclusive if state.exclusive_holder == Some(tid) => {
                    return Ok(());
                }
                LockStatus::Exclusive => {}
            }
            if self.waiters.wait_until(&mut state, deadline).timed_out() {
                warn!("{} timed out waiting for shared lock on page {}", tid, self.page_id);
                return Err(Aborted::LockWaitTimeout(tid, self.page_id));
            }
        }
    }

    /// Acquire the lock in exclusive mode.
    ///
    /// Granted immediately when the lock is free, when `tid` already holds
    /// it exclusively, or when `tid` is the sole shared holder (in-place
    /// upgrade). Otherwise waits until the other holders release or the
    /// deadline elapses.
    pub fn acquire_exclusive(&self, tid: TransactionId, timeout: Duration) -> Result<(), Aborted> {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        loop {
            match state.status {
                LockStatus::Free => {
                    state.exclusive_holder = Some(tid);
                    state.status = LockStatus::Exclusive;
                    return Ok(());
                }
                LockStatus::Exclusive if state.exclusive_holder == Some(tid) => {
                    return Ok(());
                }
                LockStatus::Shared
                    if state.shared_holders.len() == 1 && state.shared_holders.contains(&tid) =>
                {
                    // Sole shared holder: upgrade without going through free
                    state.shared_holders.clear();
                    state.exclusive_holder = Some(tid);
                    state.status = LockStatus::Exclusive;
                    return Ok(());
                }
                _ => {}
            }
            if self.waiters.wait_until(&mut state, deadline).timed_out() {
                warn!("{} timed out waiting for exclusive lock on page {}", tid, self.page_id);
                return Err(Aborted::LockWaitTimeout(tid, self.page_id));
            }
        }
    }

    /// Release whatever `tid` holds on this lock. Silent no-op if it holds
    /// nothing. Wakes all waiters on any state change.
    pub fn release(&self, tid: TransactionId) {
        let mut state = self.state.lock();
        if state.exclusive_holder == Some(tid) {
            state.exclusive_holder = None;
            state.status = LockStatus::Free;
        } else if state.shared_holders.remove(&tid) {
            if state.shared_holders.is_empty() {
                state.status = LockStatus::Free;
            }
        } else {
            return;
        }
        self.waiters.notify_all();
    }

    /// The strongest mode `tid` currently holds, if any.
    pub fn holds(&self, tid: TransactionId) -> Option<LockMode> {
        let state = self.state.lock();
        if state.exclusive_holder == Some(tid) {
            Some(LockMode::Exclusive)
        } else if state.shared_holders.contains(&tid) {
            Some(LockMode::Shared)
        } else {
            None
        }
    }
}
