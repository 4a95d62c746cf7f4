use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use log::debug;
use parking_lot::{Mutex, RwLock};

use crate::catalog::Catalog;
use crate::common::types::{PageId, PagePtr, TableId, TransactionId};
use crate::storage::buffer::error::BufferPoolError;
use crate::storage::disk::PageStore;
use crate::transaction::concurrency::{LockManager, LockMode};
use crate::tuple::Tuple;

/// Default number of resident pages
pub const DEFAULT_CAPACITY: usize = 50;

/// The transactional page cache.
///
/// Holds at most `capacity` pages in memory and mediates every page access:
/// callers go through [`get_page`](BufferPool::get_page), which takes the
/// requested page lock before touching the cache. The pool runs a
/// NO STEAL / FORCE discipline: a page dirtied by an uncommitted
/// transaction is never evicted or written out, and all of a committing
/// transaction's pages are written through at commit.
///
/// Lock ordering: the cache mutex is only ever taken while holding no page
/// latch, and is never held across disk I/O or a lock wait.
pub struct BufferPool {
    capacity: usize,
    /// Resident pages, bounded by `capacity`
    cache: Mutex<HashMap<PageId, PagePtr>>,
    /// Pages each transaction has touched while holding a lock, dirtied or
    /// merely read
    touched: Mutex<HashMap<TransactionId, HashSet<PageId>>>,
    lock_manager: LockManager,
    catalog: Arc<Catalog>,
}

impl BufferPool {
    pub fn new(capacity: usize, catalog: Arc<Catalog>) -> Self {
        Self {
            capacity,
            cache: Mutex::new(HashMap::new()),
            touched: Mutex::new(HashMap::new()),
            lock_manager: LockManager::new(),
            catalog,
        }
    }

    /// Like [`new`](BufferPool::new) with an explicit lock-wait timeout.
    /// Tests of the deadlock path use a short one.
    pub fn new_with_lock_timeout(
        capacity: usize,
        catalog: Arc<Catalog>,
        timeout: Duration,
    ) -> Self {
        Self {
            capacity,
            cache: Mutex::new(HashMap::new()),
            touched: Mutex::new(HashMap::new()),
            lock_manager: LockManager::with_timeout(timeout),
            catalog,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn lock_manager(&self) -> &LockManager {
        &self.lock_manager
    }

    /// Number of pages currently resident
    pub fn cached_pages(&self) -> usize {
        self.cache.lock().len()
    }

    /// Whether `pid` is currently resident
    pub fn contains_page(&self, pid: PageId) -> bool {
        self.cache.lock().contains_key(&pid)
    }

    /// Number of resident pages carrying uncommitted changes
    pub fn dirty_page_count(&self) -> usize {
        let pages: Vec<PagePtr> = self.cache.lock().values().cloned().collect();
        pages
            .iter()
            .filter(|page| page.read().dirtied_by().is_some())
            .count()
    }

    /// Fetch a page with the requested lock mode.
    ///
    /// Blocks until the lock is granted (or the wait times out, surfacing
    /// `Aborted`). A cached page is returned as-is; otherwise the page is
    /// loaded from its table's store, evicting a clean page first when the
    /// pool is full.
    pub fn get_page(
        &self,
        tid: TransactionId,
        pid: PageId,
        mode: LockMode,
    ) -> Result<PagePtr, BufferPoolError> {
        // The lock wait must happen before entering the cache mutex
        self.lock_manager.acquire(tid, pid, mode)?;

        if let Some(page) = self.cache.lock().get(&pid).cloned() {
            self.record_touched(tid, pid);
            return Ok(page);
        }

        // Miss: read the page outside the cache mutex, then install it.
        let store = self.store(pid.table_id)?;
        let image = store.read_page(pid)?;

        let page = {
            let mut cache = self.cache.lock();
            if let Some(existing) = cache.get(&pid).cloned() {
                // Another thread loaded the page while we were reading;
                // drop our image and use the resident one.
                existing
            } else {
                if cache.len() >= self.capacity {
                    Self::evict(&mut cache)?;
                }
                let page: PagePtr = Arc::new(RwLock::new(image));
                cache.insert(pid, page.clone());
                page
            }
        };

        self.record_touched(tid, pid);
        Ok(page)
    }

    /// Add a tuple to the given table on behalf of `tid`.
    ///
    /// The table's store performs the actual insert (taking exclusive locks
    /// through this pool); every page it reports dirtied is marked with
    /// `tid` and (re)installed in the cache so later readers see the update.
    pub fn insert_tuple(
        &self,
        tid: TransactionId,
        table_id: TableId,
        tuple: &mut Tuple,
    ) -> Result<(), BufferPoolError> {
        let store = self.store(table_id)?;
        let dirtied = store.insert_tuple(self, tid, tuple)?;
        self.install_dirtied(tid, dirtied)
    }

    /// Remove a tuple (located by its record ID) on behalf of `tid`.
    pub fn delete_tuple(&self, tid: TransactionId, tuple: &Tuple) -> Result<(), BufferPoolError> {
        let table_id = tuple
            .record_id()
            .ok_or(BufferPoolError::MissingRecordId)?
            .page_id
            .table_id;
        let store = self.store(table_id)?;
        let dirtied = store.delete_tuple(self, tid, tuple)?;
        self.install_dirtied(tid, dirtied)
    }

    /// Commit or abort `tid` and release all of its locks.
    ///
    /// Commit (FORCE): every cached page dirtied by `tid` is written
    /// through, its before-image refreshed, its dirty marker cleared.
    /// Abort: every such page is restored from its before-image in memory;
    /// disk is untouched because NO STEAL kept uncommitted data off it.
    /// Aborting is idempotent.
    pub fn transaction_complete(
        &self,
        tid: TransactionId,
        commit: bool,
    ) -> Result<(), BufferPoolError> {
        if commit {
            self.flush_pages(tid)?;
        } else {
            self.rollback_pages(tid);
        }
        self.lock_manager.release_all(tid);
        self.touched.lock().remove(&tid);
        Ok(())
    }

    /// Whether `tid` holds any lock on `pid`.
    pub fn holds_lock(&self, tid: TransactionId, pid: PageId) -> bool {
        self.lock_manager.holds(tid, pid).is_some()
    }

    /// Release a single page lock before the transaction completes.
    ///
    /// This breaks strict two-phase locking and with it serializability for
    /// the caller; the sequential scan's read-only page hand-off is the one
    /// intended user.
    pub fn unsafe_release_page(&self, tid: TransactionId, pid: PageId) {
        self.lock_manager.release(tid, pid);

        let mut touched = self.touched.lock();
        if let Some(pages) = touched.get_mut(&tid) {
            pages.remove(&pid);
            if pages.is_empty() {
                touched.remove(&tid);
            }
        }
    }

    /// Drop `pid` from the cache without writing it. For callers that have
    /// just deallocated the page or rolled it back on disk.
    pub fn discard_page(&self, pid: PageId) {
        self.cache.lock().remove(&pid);
    }

    /// Write through every dirty page in the pool.
    ///
    /// Shutdown/testing aid. Calling this while transactions are in flight
    /// puts uncommitted data on disk and breaks the NO STEAL guarantee.
    pub fn flush_all_pages(&self) -> Result<(), BufferPoolError> {
        let pages: Vec<PagePtr> = self.cache.lock().values().cloned().collect();
        for page in pages {
            let mut guard = page.write();
            if guard.dirtied_by().is_none() {
                continue;
            }
            let store = self.store(guard.id().table_id)?;
            store.write_page(&guard)?;
            guard.mark_clean();
        }
        Ok(())
    }

    /// Write through every page dirtied by `tid` and refresh before-images.
    fn flush_pages(&self, tid: TransactionId) -> Result<(), BufferPoolError> {
        for page in self.resident_touched(tid) {
            let mut guard = page.write();
            if guard.dirtied_by() != Some(tid) {
                continue;
            }
            let store = self.store(guard.id().table_id)?;
            store.write_page(&guard)?;
            guard.set_before_image();
            guard.mark_clean();
            debug!("flushed page {} at commit of {}", guard.id(), tid);
        }
        Ok(())
    }

    /// Restore the before-image of every page dirtied by `tid`.
    fn rollback_pages(&self, tid: TransactionId) {
        for page in self.resident_touched(tid) {
            let mut guard = page.write();
            if guard.dirtied_by() != Some(tid) {
                continue;
            }
            guard.restore_before_image();
            guard.mark_clean();
            debug!("rolled back page {} at abort of {}", guard.id(), tid);
        }
    }

    /// Mark the returned pages dirty and make sure the cache holds exactly
    /// these instances.
    fn install_dirtied(
        &self,
        tid: TransactionId,
        pages: Vec<PagePtr>,
    ) -> Result<(), BufferPoolError> {
        for page in pages {
            // Take the page latch first and let go of it before entering
            // the cache mutex
            let pid = {
                let mut guard = page.write();
                guard.mark_dirty(tid);
                guard.id()
            };

            {
                let mut cache = self.cache.lock();
                if !cache.contains_key(&pid) && cache.len() >= self.capacity {
                    Self::evict(&mut cache)?;
                }
                cache.insert(pid, page.clone());
            }

            self.record_touched(tid, pid);
        }
        Ok(())
    }

    /// Remove one clean page from the cache. The first clean page found
    /// wins; a dirty page is never a victim (NO STEAL). Locks held on the
    /// victim survive eviction: they guard the logical page, not the frame.
    fn evict(cache: &mut HashMap<PageId, PagePtr>) -> Result<(), BufferPoolError> {
        let victim = cache
            .iter()
            .find(|(_, page)| page.read().dirtied_by().is_none())
            .map(|(pid, _)| *pid);

        match victim {
            Some(pid) => {
                cache.remove(&pid);
                debug!("evicted clean page {}", pid);
                Ok(())
            }
            None => Err(BufferPoolError::AllPagesDirty),
        }
    }

    /// Pages `tid` touched that are still resident.
    fn resident_touched(&self, tid: TransactionId) -> Vec<PagePtr> {
        let pids: Vec<PageId> = {
            let touched = self.touched.lock();
            touched
                .get(&tid)
                .map(|pages| pages.iter().copied().collect())
                .unwrap_or_default()
        };

        let cache = self.cache.lock();
        pids.into_iter()
            .filter_map(|pid| cache.get(&pid).cloned())
            .collect()
    }

    fn record_touched(&self, tid: TransactionId, pid: PageId) {
        self.touched.lock().entry(tid).or_default().insert(pid);
    }

    fn store(&self, table_id: TableId) -> Result<Arc<dyn PageStore>, BufferPoolError> {
        self.catalog
            .table(table_id)
            .ok_or(BufferPoolError::UnknownTable(table_id))
    }
}
