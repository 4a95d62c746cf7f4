// Export public modules
pub mod catalog;
pub mod common;
pub mod execution;
pub mod optimizer;
pub mod storage;
pub mod transaction;
pub mod tuple;

// Re-export key items for convenient access
pub use catalog::Catalog;
pub use storage::buffer::BufferPool;
pub use storage::buffer::BufferPoolError;
pub use storage::disk::{HeapFile, PageStore};
pub use storage::page::PageManager;
pub use storage::page::PageError;
pub use transaction::concurrency::{LockManager, LockMode};
pub use transaction::Aborted;
