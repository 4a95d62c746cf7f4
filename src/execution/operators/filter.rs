// Filter Operator
//
// Passes through only the child tuples that satisfy a predicate.

use crate::execution::error::ExecResult;
use crate::execution::operators::Operator;
use crate::execution::predicate::Predicate;
use crate::tuple::{Tuple, TupleDesc};

pub struct Filter {
    child: Box<dyn Operator>,
    predicate: Predicate,
}

impl Filter {
    pub fn new(predicate: Predicate, child: Box<dyn Operator>) -> Self {
        Self { child, predicate }
    }
}

impl Operator for Filter {
    fn open(&mut self) -> ExecResult<()> {
        self.child.open()
    }

    fn next(&mut self) -> ExecResult<Option<Tuple>> {
        while let Some(tuple) = self.child.next()? {
            if self.predicate.eval(&tuple)? {
                return Ok(Some(tuple));
            }
        }
        Ok(None)
    }

    fn rewind(&mut self) -> ExecResult<()> {
        self.child.rewind()
    }

    fn close(&mut self) -> ExecResult<()> {
        self.child.close()
    }

    fn tuple_desc(&self) -> &TupleDesc {
        self.child.tuple_desc()
    }
}
