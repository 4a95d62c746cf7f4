use crate::execution::error::{ExecResult, ExecutionError};
use crate::tuple::{Tuple, Value};

/// Comparison operators usable in predicates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Equals,
    NotEquals,
    LessThan,
    LessThanOrEq,
    GreaterThan,
    GreaterThanOrEq,
}

impl Op {
    /// Compare two values under this operator. Ordered comparisons against
    /// an incomparable pair (e.g. anything with `Null`) are false.
    pub fn compare(self, a: &Value, b: &Value) -> bool {
        use std::cmp::Ordering::*;
        match self {
            Op::Equals => a == b,
            Op::NotEquals => a != b,
            Op::LessThan => matches!(a.partial_cmp(b), Some(Less)),
            Op::LessThanOrEq => matches!(a.partial_cmp(b), Some(Less | Equal)),
            Op::GreaterThan => matches!(a.partial_cmp(b), Some(Greater)),
            Op::GreaterThanOrEq => matches!(a.partial_cmp(b), Some(Greater | Equal)),
        }
    }
}

/// Compares one field of a tuple against a constant
#[derive(Debug, Clone)]
pub struct Predicate {
    pub field: usize,
    pub op: Op,
    pub operand: Value,
}

impl Predicate {
    pub fn new(field: usize, op: Op, operand: Value) -> Self {
        Self { field, op, operand }
    }

    pub fn eval(&self, tuple: &Tuple) -> ExecResult<bool> {
        let value = tuple
            .value(self.field)
            .ok_or(ExecutionError::FieldOutOfRange(self.field))?;
        Ok(self.op.compare(value, &self.operand))
    }
}

/// Compares a field of a left tuple against a field of a right tuple
#[derive(Debug, Clone, Copy)]
pub struct JoinPredicate {
    pub left_field: usize,
    pub op: Op,
    pub right_field: usize,
}

impl JoinPredicate {
    pub fn new(left_field: usize, op: Op, right_field: usize) -> Self {
        Self {
            left_field,
            op,
            right_field,
        }
    }

    pub fn eval(&self, left: &Tuple, right: &Tuple) -> ExecResult<bool> {
        let l = left
            .value(self.left_field)
            .ok_or(ExecutionError::FieldOutOfRange(self.left_field))?;
        let r = right
            .value(self.right_field)
            .ok_or(ExecutionError::FieldOutOfRange(self.right_field))?;
        Ok(self.op.compare(l, r))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compare_ops() {
        let a = Value::Integer(3);
        let b = Value::Integer(5);

        assert!(Op::LessThan.compare(&a, &b));
        assert!(Op::LessThanOrEq.compare(&a, &a));
        assert!(Op::GreaterThan.compare(&b, &a));
        assert!(Op::NotEquals.compare(&a, &b));
        assert!(!Op::Equals.compare(&a, &b));

        // Integer/float comparison crosses types
        assert!(Op::Equals.compare(&Value::Integer(2), &Value::Integer(2)));
        assert!(Op::LessThan.compare(&Value::Integer(2), &Value::Float(2.5)));
    }

    #[test]
    fn test_null_is_incomparable() {
        assert!(!Op::LessThan.compare(&Value::Null, &Value::Integer(1)));
        assert!(!Op::GreaterThanOrEq.compare(&Value::Integer(1), &Value::Null));
        assert!(Op::Equals.compare(&Value::Null, &Value::Null));
    }

    #[test]
    fn test_predicate_eval() {
        let tuple = Tuple::new(vec![Value::Integer(10), Value::Text("x".into())]);
        assert!(Predicate::new(0, Op::GreaterThan, Value::Integer(5))
            .eval(&tuple)
            .unwrap());
        assert!(Predicate::new(9, Op::Equals, Value::Integer(0))
            .eval(&tuple)
            .is_err());
    }
}
