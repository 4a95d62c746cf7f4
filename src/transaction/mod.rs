// Transaction concurrency-control module

pub mod concurrency;

// Public exports
pub use concurrency::{LockManager, LockMode, PageLock};

use thiserror::Error;

use crate::common::types::{PageId, TransactionId};

/// A transaction that cannot make progress. The only source today is a
/// lock-wait timeout, which is how lock cycles get broken: one participant
/// times out and must be rolled back via
/// `BufferPool::transaction_complete(tid, false)`.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aborted {
    #[error("transaction {0} timed out waiting for a lock on page {1}")]
    LockWaitTimeout(TransactionId, PageId),
}
