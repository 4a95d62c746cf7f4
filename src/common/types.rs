use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use parking_lot::RwLock;

/// Page size in bytes (4KB)
pub const PAGE_SIZE: usize = 4096;

/// Table ID type
pub type TableId = u32;

/// Record slot index within a page
pub type SlotId = u32;

/// Identifies one fixed-size page of one table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageId {
    pub table_id: TableId,
    pub page_no: u32,
}

impl PageId {
    pub fn new(table_id: TableId, page_no: u32) -> Self {
        Self { table_id, page_no }
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.table_id, self.page_no)
    }
}

static NEXT_TRANSACTION_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique transaction token. Two tokens are equal only if they came
/// from the same `TransactionId::new` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransactionId(u64);

impl TransactionId {
    pub fn new() -> Self {
        TransactionId(NEXT_TRANSACTION_ID.fetch_add(1, Ordering::SeqCst))
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// In-memory image of one disk page.
///
/// Besides the raw payload, a page carries the ID of the transaction that
/// dirtied it (if any) and a before-image: a snapshot of the payload as last
/// read from disk or as last committed, used to roll the page back when its
/// dirtying transaction aborts.
#[derive(Debug, Clone)]
pub struct Page {
    pub data: [u8; PAGE_SIZE],
    page_id: PageId,
    dirtied_by: Option<TransactionId>,
    before_image: [u8; PAGE_SIZE],
}

impl Page {
    pub fn new(page_id: PageId) -> Self {
        Self {
            data: [0; PAGE_SIZE],
            page_id,
            dirtied_by: None,
            before_image: [0; PAGE_SIZE],
        }
    }

    /// Build a page from bytes read off disk. The before-image starts out
    /// equal to the on-disk payload.
    pub fn from_bytes(page_id: PageId, data: [u8; PAGE_SIZE]) -> Self {
        Self {
            data,
            page_id,
            dirtied_by: None,
            before_image: data,
        }
    }

    pub fn id(&self) -> PageId {
        self.page_id
    }

    pub fn dirtied_by(&self) -> Option<TransactionId> {
        self.dirtied_by
    }

    pub fn mark_dirty(&mut self, tid: TransactionId) {
        self.dirtied_by = Some(tid);
    }

    pub fn mark_clean(&mut self) {
        self.dirtied_by = None;
    }

    /// Snapshot the current payload as the new before-image. Called when the
    /// page is loaded and again each time its changes are committed.
    pub fn set_before_image(&mut self) {
        self.before_image.copy_from_slice(&self.data);
    }

    /// Throw away uncommitted changes by restoring the last before-image.
    pub fn restore_before_image(&mut self) {
        self.data.copy_from_slice(&self.before_image);
    }

    pub fn before_image(&self) -> &[u8] {
        &self.before_image
    }
}

/// Smart pointer to a page
pub type PagePtr = Arc<RwLock<Page>>;
