mod heap_file;

pub use heap_file::HeapFile;

use thiserror::Error;

use crate::common::types::{Page, PageId, PagePtr, TableId, TransactionId};
use crate::storage::buffer::{BufferPool, BufferPoolError};
use crate::tuple::{Tuple, TupleDesc};

#[derive(Error, Debug)]
pub enum DiskError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("page {0} is beyond the end of its file")]
    PageOutOfBounds(PageId),
    #[error("page {0} belongs to a different table")]
    WrongTable(PageId),
}

/// Persistent page-addressable storage for one table.
///
/// `insert_tuple` and `delete_tuple` obtain the pages they modify through
/// the buffer pool handed to them, so every page they touch is properly
/// locked and cached. The mutual recursion is safe because page locks are
/// reentrant per transaction.
pub trait PageStore: Send + Sync {
    fn table_id(&self) -> TableId;

    fn tuple_desc(&self) -> &TupleDesc;

    /// Read one page image off disk.
    fn read_page(&self, pid: PageId) -> Result<Page, DiskError>;

    /// Write one page image; durable on return.
    fn write_page(&self, page: &Page) -> Result<(), DiskError>;

    /// Append a fresh, initialized page and return its ID.
    fn allocate_page(&self) -> Result<PageId, DiskError>;

    fn num_pages(&self) -> Result<u32, DiskError>;

    /// Insert a tuple and return the pages the insert dirtied. Assigns the
    /// tuple's record ID.
    fn insert_tuple(
        &self,
        pool: &BufferPool,
        tid: TransactionId,
        tuple: &mut Tuple,
    ) -> Result<Vec<PagePtr>, BufferPoolError>;

    /// Delete a tuple located by its record ID and return the pages the
    /// delete dirtied.
    fn delete_tuple(
        &self,
        pool: &BufferPool,
        tid: TransactionId,
        tuple: &Tuple,
    ) -> Result<Vec<PagePtr>, BufferPoolError>;
}
