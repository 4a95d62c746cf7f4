use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use parking_lot::Mutex;

use crate::common::types::{Page, PageId, PagePtr, TableId, TransactionId, PAGE_SIZE};
use crate::storage::buffer::{BufferPool, BufferPoolError};
use crate::storage::page::{PageError, PageManager};
use crate::transaction::concurrency::LockMode;
use crate::tuple::{RecordId, Tuple, TupleDesc};

use super::{DiskError, PageStore};

/// A heap file stores one table's tuples in no particular order, as a flat
/// sequence of slotted pages addressed by page number.
pub struct HeapFile {
    table_id: TableId,
    file: Mutex<File>,
    tuple_desc: TupleDesc,
    page_manager: PageManager,
}

impl HeapFile {
    /// Open (or create) the backing file for a table.
    pub fn new(
        path: impl AsRef<Path>,
        table_id: TableId,
        tuple_desc: TupleDesc,
    ) -> Result<Self, DiskError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)?;

        Ok(Self {
            table_id,
            file: Mutex::new(file),
            tuple_desc,
            page_manager: PageManager::new(),
        })
    }

    fn page_offset(page_no: u32) -> u64 {
        page_no as u64 * PAGE_SIZE as u64
    }

    fn check_table(&self, pid: PageId) -> Result<(), DiskError> {
        if pid.table_id != self.table_id {
            return Err(DiskError::WrongTable(pid));
        }
        Ok(())
    }
}

impl PageStore for HeapFile {
    fn table_id(&self) -> TableId {
        self.table_id
    }

    fn tuple_desc(&self) -> &TupleDesc {
        &self.tuple_desc
    }

    fn read_page(&self, pid: PageId) -> Result<Page, DiskError> {
        self.check_table(pid)?;

        let mut file = self.file.lock();
        let file_size = file.metadata()?.len();
        let offset = Self::page_offset(pid.page_no);
        if offset >= file_size {
            return Err(DiskError::PageOutOfBounds(pid));
        }

        file.seek(SeekFrom::Start(offset))?;
        let mut buffer = [0u8; PAGE_SIZE];
        file.read_exact(&mut buffer)?;

        Ok(Page::from_bytes(pid, buffer))
    }

    fn write_page(&self, page: &Page) -> Result<(), DiskError> {
        self.check_table(page.id())?;

        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(Self::page_offset(page.id().page_no)))?;
        file.write_all(&page.data)?;
        file.flush()?;

        Ok(())
    }

    fn allocate_page(&self) -> Result<PageId, DiskError> {
        let mut file = self.file.lock();
        let file_size = file.metadata()?.len();
        let page_no = (file_size / PAGE_SIZE as u64) as u32;
        let pid = PageId::new(self.table_id, page_no);

        // Write a valid empty-page image so a later read sees an
        // initialized header.
        let mut page = Page::new(pid);
        self.page_manager.init_page(&mut page);

        file.seek(SeekFrom::End(0))?;
        file.write_all(&page.data)?;
        file.flush()?;

        Ok(pid)
    }

    fn num_pages(&self) -> Result<u32, DiskError> {
        let file = self.file.lock();
        let file_size = file.metadata()?.len();
        Ok((file_size / PAGE_SIZE as u64) as u32)
    }

    fn insert_tuple(
        &self,
        pool: &BufferPool,
        tid: TransactionId,
        tuple: &mut Tuple,
    ) -> Result<Vec<PagePtr>, BufferPoolError> {
        if !tuple.matches(&self.tuple_desc) {
            return Err(BufferPoolError::SchemaMismatch);
        }
        let data = tuple.to_bytes()?;

        // Probe each page under a shared lock, upgrading to exclusive only
        // on the page that will actually take the tuple.
        for page_no in 0..self.num_pages()? {
            let pid = PageId::new(self.table_id, page_no);

            let page = pool.get_page(tid, pid, LockMode::Shared)?;
            let fits = self.page_manager.has_space_for(&page.read(), data.len());
            if !fits {
                continue;
            }

            let page = pool.get_page(tid, pid, LockMode::Exclusive)?;
            let mut guard = page.write();
            match self.page_manager.insert_record(&mut guard, &data) {
                Ok(slot) => {
                    tuple.set_record_id(RecordId { page_id: pid, slot });
                    drop(guard);
                    return Ok(vec![page]);
                }
                Err(PageError::InsufficientSpace) => continue,
                Err(e) => return Err(e.into()),
            }
        }

        // Every existing page is full: extend the file.
        let pid = self.allocate_page()?;
        let page = pool.get_page(tid, pid, LockMode::Exclusive)?;
        let slot = {
            let mut guard = page.write();
            self.page_manager.insert_record(&mut guard, &data)?
        };
        tuple.set_record_id(RecordId { page_id: pid, slot });

        Ok(vec![page])
    }

    fn delete_tuple(
        &self,
        pool: &BufferPool,
        tid: TransactionId,
        tuple: &Tuple,
    ) -> Result<Vec<PagePtr>, BufferPoolError> {
        let rid = tuple.record_id().ok_or(BufferPoolError::MissingRecordId)?;
        self.check_table(rid.page_id)?;

        let page = pool.get_page(tid, rid.page_id, LockMode::Exclusive)?;
        {
            let mut guard = page.write();
            self.page_manager.delete_record(&mut guard, rid.slot)?;
        }

        Ok(vec![page])
    }
}
