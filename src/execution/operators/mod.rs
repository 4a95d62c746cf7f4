// Query Operators Module
//
// Each operator implements the shared `Operator` trait and owns its
// children, so a query plan is a tree of boxed operators.

pub mod aggregate;
pub mod delete;
pub mod filter;
pub mod insert;
pub mod join;
pub mod scan;

pub use aggregate::{Aggregate, AggregateFn};
pub use delete::Delete;
pub use filter::Filter;
pub use insert::Insert;
pub use join::Join;
pub use scan::SeqScan;

use crate::execution::error::ExecResult;
use crate::tuple::{Tuple, TupleDesc};

/// The interface shared by all operators in the iterator execution model.
///
/// `next` returns `None` when the operator is exhausted; `rewind` restarts
/// it from the beginning without re-opening.
pub trait Operator: Send {
    /// Initialize the operator before execution
    fn open(&mut self) -> ExecResult<()>;

    /// Produce the next tuple, or `None` when exhausted
    fn next(&mut self) -> ExecResult<Option<Tuple>>;

    /// Restart iteration from the beginning
    fn rewind(&mut self) -> ExecResult<()>;

    /// Release any resources held by the operator
    fn close(&mut self) -> ExecResult<()>;

    /// Schema of the tuples this operator produces
    fn tuple_desc(&self) -> &TupleDesc;
}
