use crate::common::types::{Page, SlotId, PAGE_SIZE};
use crate::storage::page::header::PageHeader;
use crate::storage::page::error::PageError;
use crate::storage::page::layout::{RecordLocation, HEADER_SIZE, SLOT_SIZE};

/// Stateless slotted-page layout operations.
///
/// Record data grows forward from just past the header; the slot array grows
/// backward from the end of the page. A deleted record keeps its slot with
/// length 0, so slot indices stay stable for the lifetime of the page.
pub struct PageManager {}

impl Default for PageManager {
    fn default() -> Self {
        Self::new()
    }
}

impl PageManager {
    pub fn new() -> Self {
        Self {}
    }

    pub fn init_page(&self, page: &mut Page) {
        let header = PageHeader::new();
        let header_bytes = header.to_bytes();
        page.data[0..HEADER_SIZE].copy_from_slice(&header_bytes);
    }

    /// Insert a record and return its slot index.
    pub fn insert_record(&self, page: &mut Page, data: &[u8]) -> Result<SlotId, PageError> {
        let mut header = self.get_header(page);

        // Record size plus the slot entry for the record
        let record_size = data.len() as u32;
        let total_space_needed = record_size + SLOT_SIZE as u32;

        if header.free_space_size < total_space_needed {
            return Err(PageError::InsufficientSpace);
        }

        // Slot for the new record sits just below the existing slot array
        let slot_pos = Self::slot_position(header.record_count);

        let record_loc = RecordLocation {
            offset: header.free_space_offset,
            length: record_size,
        };

        // Write record data
        let data_end = header.free_space_offset as usize + data.len();
        page.data[header.free_space_offset as usize..data_end].copy_from_slice(data);

        // Write slot entry
        let slot_bytes = record_loc.to_bytes();
        page.data[slot_pos..slot_pos + SLOT_SIZE].copy_from_slice(&slot_bytes);

        // Update header
        header.free_space_offset += record_size;
        header.free_space_size -= total_space_needed;
        header.record_count += 1;
        self.put_header(page, header);

        Ok(header.record_count - 1)
    }

    /// Tombstone a record by zeroing its slot length. The record's space is
    /// not reclaimed; slot indices of later records are unaffected.
    pub fn delete_record(&self, page: &mut Page, slot: SlotId) -> Result<(), PageError> {
        let header = self.get_header(page);

        if slot >= header.record_count {
            return Err(PageError::InvalidRecordId);
        }

        let slot_pos = Self::slot_position(slot);
        let mut record_loc = self.get_record_location(page, slot_pos);

        if record_loc.length == 0 {
            return Err(PageError::RecordNotFound); // Already deleted
        }

        record_loc.length = 0;
        let slot_bytes = record_loc.to_bytes();
        page.data[slot_pos..slot_pos + SLOT_SIZE].copy_from_slice(&slot_bytes);

        Ok(())
    }

    pub fn get_record(&self, page: &Page, slot: SlotId) -> Result<Vec<u8>, PageError> {
        let header = self.get_header(page);

        if slot >= header.record_count {
            return Err(PageError::InvalidRecordId);
        }

        let slot_pos = Self::slot_position(slot);
        let record_loc = self.get_record_location(page, slot_pos);

        if record_loc.length == 0 {
            return Err(PageError::RecordNotFound); // Deleted record
        }

        let start = record_loc.offset as usize;
        let end = start + record_loc.length as usize;
        Ok(page.data[start..end].to_vec())
    }

    /// All live (non-tombstoned) records on the page, with their slots.
    pub fn live_records(&self, page: &Page) -> Vec<(SlotId, Vec<u8>)> {
        let header = self.get_header(page);
        let mut records = Vec::new();

        for slot in 0..header.record_count {
            let slot_pos = Self::slot_position(slot);
            let record_loc = self.get_record_location(page, slot_pos);
            if record_loc.length == 0 {
                continue;
            }
            let start = record_loc.offset as usize;
            let end = start + record_loc.length as usize;
            records.push((slot, page.data[start..end].to_vec()));
        }

        records
    }

    /// Whether a record of `len` bytes (plus its slot entry) fits.
    pub fn has_space_for(&self, page: &Page, len: usize) -> bool {
        self.get_header(page).free_space_size as usize >= len + SLOT_SIZE
    }

    pub fn get_free_space(&self, page: &Page) -> u32 {
        self.get_header(page).free_space_size
    }

    pub fn record_count(&self, page: &Page) -> u32 {
        self.get_header(page).record_count
    }

    pub fn get_header(&self, page: &Page) -> PageHeader {
        PageHeader::from_bytes(&page.data[0..HEADER_SIZE])
    }

    fn put_header(&self, page: &mut Page, header: PageHeader) {
        let header_bytes = header.to_bytes();
        page.data[0..HEADER_SIZE].copy_from_slice(&header_bytes);
    }

    fn slot_position(slot: SlotId) -> usize {
        PAGE_SIZE - SLOT_SIZE * (slot as usize + 1)
    }

    fn get_record_location(&self, page: &Page, slot_pos: usize) -> RecordLocation {
        RecordLocation::from_bytes(&page.data[slot_pos..slot_pos + SLOT_SIZE])
    }
}
