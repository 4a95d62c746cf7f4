use thiserror::Error;

use crate::common::types::TableId;
use crate::storage::buffer::BufferPoolError;

#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("no table registered with id {0}")]
    TableNotFound(TableId),

    #[error("field index {0} out of range")]
    FieldOutOfRange(usize),

    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    #[error("operator is not open")]
    NotOpen,

    #[error("buffer pool error: {0}")]
    Buffer(#[from] BufferPoolError),

    #[error("tuple decoding failed: {0}")]
    Decoding(#[from] bincode::Error),
}

pub type ExecResult<T> = Result<T, ExecutionError>;
