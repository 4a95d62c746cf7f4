// Insert Operator
//
// Drains its child and routes every tuple through the buffer pool, so each
// dirtied page is locked and tracked for the inserting transaction. Emits a
// single tuple holding the insert count.

use std::sync::Arc;

use crate::common::types::{TableId, TransactionId};
use crate::execution::error::{ExecResult, ExecutionError};
use crate::execution::operators::Operator;
use crate::storage::buffer::BufferPool;
use crate::tuple::{Column, DataType, Tuple, TupleDesc, Value};

pub struct Insert {
    pool: Arc<BufferPool>,
    tid: TransactionId,
    table_id: TableId,
    child: Box<dyn Operator>,
    desc: TupleDesc,
    inserted: Option<i64>,
    emitted: bool,
}

impl Insert {
    pub fn new(
        pool: Arc<BufferPool>,
        tid: TransactionId,
        table_id: TableId,
        child: Box<dyn Operator>,
    ) -> Self {
        Self {
            pool,
            tid,
            table_id,
            child,
            desc: TupleDesc::new(vec![Column::new("inserted", DataType::Integer)]),
            inserted: None,
            emitted: false,
        }
    }
}

impl Operator for Insert {
    fn open(&mut self) -> ExecResult<()> {
        self.child.open()?;
        self.inserted = None;
        self.emitted = false;
        Ok(())
    }

    fn next(&mut self) -> ExecResult<Option<Tuple>> {
        if self.emitted {
            return Ok(None);
        }

        // The child is drained exactly once, on first call
        if self.inserted.is_none() {
            let mut count = 0i64;
            while let Some(mut tuple) = self.child.next()? {
                self.pool.insert_tuple(self.tid, self.table_id, &mut tuple)?;
                count += 1;
            }
            self.inserted = Some(count);
        }

        self.emitted = true;
        let count = self.inserted.ok_or(ExecutionError::NotOpen)?;
        Ok(Some(Tuple::new(vec![Value::Integer(count)])))
    }

    fn rewind(&mut self) -> ExecResult<()> {
        // The side effect is not replayed; only the count tuple can be
        // read again.
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
