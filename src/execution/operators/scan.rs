// Sequential Scan Operator
//
// Walks every page of a table through the buffer pool under shared locks.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::catalog::Catalog;
use crate::common::types::{PageId, TableId, TransactionId};
use crate::execution::error::{ExecResult, ExecutionError};
use crate::execution::operators::Operator;
use crate::storage::buffer::{BufferPool, BufferPoolError};
use crate::storage::disk::PageStore;
use crate::storage::page::PageManager;
use crate::transaction::concurrency::LockMode;
use crate::tuple::{RecordId, Tuple, TupleDesc};

/// Full-table scan in storage order.
///
/// The scan copies each page's live tuples out under a shared lock and then
/// hands the lock back (`unsafe_release_page`) before moving to the next
/// page, so a long read-only scan does not accumulate a table-sized lock
/// set. That early release breaks strict two-phase locking and therefore
/// serializability for the scan; it is this operator's documented trade.
/// A page the scanning transaction holds exclusively (because it dirtied
/// it) keeps its lock.
pub struct SeqScan {
    pool: Arc<BufferPool>,
    store: Arc<dyn PageStore>,
    tid: TransactionId,
    table_id: TableId,
    desc: TupleDesc,
    page_manager: PageManager,
    num_pages: u32,
    next_page: u32,
    buffered: VecDeque<Tuple>,
    opened: bool,
}

impl SeqScan {
    pub fn new(
        pool: Arc<BufferPool>,
        catalog: &Catalog,
        tid: TransactionId,
        table_id: TableId,
    ) -> ExecResult<Self> {
        let store = catalog
            .table(table_id)
            .ok_or(ExecutionError::TableNotFound(table_id))?;
        let desc = store.tuple_desc().clone();

        Ok(Self {
            pool,
            store,
            tid,
            table_id,
            desc,
            page_manager: PageManager::new(),
            num_pages: 0,
            next_page: 0,
            buffered: VecDeque::new(),
            opened: false,
        })
    }

    /// Pull the next page's live tuples into the buffer. Returns false when
    /// the table is exhausted.
    fn fill_from_next_page(&mut self) -> ExecResult<bool> {
        if self.next_page >= self.num_pages {
            return Ok(false);
        }

        let pid = PageId::new(self.table_id, self.next_page);
        let page = self.pool.get_page(self.tid, pid, LockMode::Shared)?;

        {
            let guard = page.read();
            for (slot, bytes) in self.page_manager.live_records(&guard) {
                let mut tuple = Tuple::from_bytes(&bytes)?;
                tuple.set_record_id(RecordId { page_id: pid, slot });
                self.buffered.push_back(tuple);
            }
        }

        // Read-only hand-off: the rows are copied out, so the shared lock
        // can go back early. Keep the lock if this transaction holds the
        // page exclusively.
        if self.pool.lock_manager().holds(self.tid, pid) == Some(LockMode::Shared) {
            self.pool.unsafe_release_page(self.tid, pid);
        }

        self.next_page += 1;
        Ok(true)
    }
}

impl Operator for SeqScan {
    fn open(&mut self) -> ExecResult<()> {
        self.num_pages = self.store.num_pages().map_err(BufferPoolError::from)?;
        self.next_page = 0;
        self.buffered.clear();
        self.opened = true;
        Ok(())
    }

    fn next(&mut self) -> ExecResult<Option<Tuple>> {
        if !self.opened {
            return Err(ExecutionError::NotOpen);
        }
        loop {
            if let Some(tuple) = self.buffered.pop_front() {
                return Ok(Some(tuple));
            }
            if !self.fill_from_next_page()? {
                return Ok(None);
            }
        }
    }

    fn rewind(&mut self) -> ExecResult<()> {
        if !self.opened {
            return Err(ExecutionError::NotOpen);
        }
        self.next_page = 0;
        self.buffered.clear();
        Ok(())
    }

    fn close(&mut self) -> ExecResult<()> {
        self.opened = false;
        self.buffered.clear();
        Ok(())
    }

    fn tuple_desc(&self) -> &TupleDesc {
        &self.desc
    }
}
