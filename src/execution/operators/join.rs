// Nested-Loop Join Operator
//
// For every left tuple the right child is rewound and scanned in full.

use crate::execution::error::ExecResult;
use crate::execution::operators::Operator;
use crate::execution::predicate::JoinPredicate;
use crate::tuple::{Tuple, TupleDesc};

pub struct Join {
    left: Box<dyn Operator>,
    right: Box<dyn Operator>,
    predicate: JoinPredicate,
    desc: TupleDesc,
    current_left: Option<Tuple>,
}

impl Join {
    pub fn new(predicate: JoinPredicate, left: Box<dyn Operator>, right: Box<dyn Operator>) -> Self {
        let desc = TupleDesc::merge(left.tuple_desc(), right.tuple_desc());
        Self {
            left,
            right,
            predicate,
            desc,
            current_left: None,
        }
    }
}

impl Operator for Join {
    fn open(&mut self) -> ExecResult<()> {
        self.left.open()?;
        self.right.open()?;
        self.current_left = None;
        Ok(())
    }

    fn next(&mut self) -> ExecResult<Option<Tuple>> {
        loop {
            let left_tuple = match self.current_left.clone() {
                Some(tuple) => tuple,
                None => match self.left.next()? {
                    Some(tuple) => {
                        self.right.rewind()?;
                        self.current_left = Some(tuple.clone());
                        tuple
                    }
                    None => return Ok(None),
                },
            };

            match self.right.next()? {
                Some(right_tuple) => {
                    if self.predicate.eval(&left_tuple, &right_tuple)? {
                        return Ok(Some(Tuple::combine(&left_tuple, &right_tuple)));
                    }
                }
                None => {
                    // Right side exhausted for this left tuple
                    self.current_left = None;
                }
            }
        }
    }

    fn rewind(&mut self) -> ExecResult<()> {
        self.left.rewind()?;
        self.right.rewind()?;
        self.current_left = None;
        Ok(())
    }

    fn close(&mut self) -> ExecResult<()> {
        self.left.close()?;
        self.right.close()
    }

    fn tuple_desc(&self) -> &TupleDesc {
        &self.desc
    }
}
