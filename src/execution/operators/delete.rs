// Delete Operator
//
// Drains its child and removes every tuple it produces, locating each one
// by its record ID. Emits a single tuple holding the delete count.

use std::sync::Arc;

use crate::common::types::TransactionId;
use crate::execution::error::{ExecResult, ExecutionError};
use crate::execution::operators::Operator;
use crate::storage::buffer::BufferPool;
use crate::tuple::{Column, DataType, Tuple, TupleDesc, Value};

pub struct Delete {
    pool: Arc<BufferPool>,
    tid: TransactionId,
    child: Box<dyn Operator>,
    desc: TupleDesc,
    deleted: Option<i64>,
    emitted: bool,
}

impl Delete {
    pub fn new(pool: Arc<BufferPool>, tid: TransactionId, child: Box<dyn Operator>) -> Self {
        Self {
            pool,
            tid,
            child,
            desc: TupleDesc::new(vec![Column::new("deleted", DataType::Integer)]),
            deleted: None,
            emitted: false,
        }
    }
}

impl Operator for Delete {
    fn open(&mut self) -> ExecResult<()> {
        self.child.open()?;
        self.deleted = None;
        self.emitted = false;
        Ok(())
    }

    fn next(&mut self) -> ExecResult<Option<Tuple>> {
        if self.emitted {
            return Ok(None);
        }

        if self.deleted.is_none() {
            let mut count = 0i64;
            while let Some(tuple) = self.child.next()? {
                self.pool.delete_tuple(self.tid, &tuple)?;
                count += 1;
            }
            self.deleted = Some(count);
        }

        self.emitted = true;
        let count = self.deleted.ok_or(ExecutionError::NotOpen)?;
        Ok(Some(Tuple::new(vec![Value::Integer(count)])))
    }

    fn rewind(&mut self) -> ExecResult<()> {
        self.emitted = false;
        Ok(())
    }

    fn close(&mut self) -> ExecResult<()> {
        self.child.close()
    }

    fn tuple_desc(&self) -> &TupleDesc {
        &self.desc
    }
}
