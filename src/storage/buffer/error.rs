use thiserror::Error;

use crate::common::types::TableId;
use crate::storage::disk::DiskError;
use crate::storage::page::PageError;
use crate::transaction::Aborted;

#[derive(Error, Debug)]
pub enum BufferPoolError {
    #[error("all cached pages are dirty, eviction failed")]
    AllPagesDirty,

    #[error("no table registered with id {0}")]
    UnknownTable(TableId),

    #[error("tuple has no record id")]
    MissingRecordId,

    #[error("tuple does not match the table schema")]
    SchemaMismatch,

    #[error(transparent)]
    Aborted(#[from] Aborted),

    #[error("page error: {0}")]
    Page(#[from] PageError),

    #[error("disk error: {0}")]
    Disk(#[from] DiskError),

    #[error("tuple encoding failed: {0}")]
    Encoding(#[from] bincode::Error),
}

impl BufferPoolError {
    /// Whether this failure means the transaction must be rolled back (as
    /// opposed to a structural error that is fatal for the statement). The
    /// correct response is `BufferPool::transaction_complete(tid, false)`.
    pub fn is_aborted(&self) -> bool {
        matches!(self, BufferPoolError::Aborted(_))
    }
}
