mod desc;
mod value;

pub use desc::{Column, TupleDesc};
pub use value::{DataType, Value};

use crate::common::types::{PageId, SlotId};

/// Location of a stored tuple: the page holding it plus its slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordId {
    pub page_id: PageId,
    pub slot: SlotId,
}

/// A row of values. A tuple that has been stored also carries the record ID
/// it was stored under.
#[derive(Debug, Clone, PartialEq)]
pub struct Tuple {
    values: Vec<Value>,
    record_id: Option<RecordId>,
}

impl Tuple {
    pub fn new(values: Vec<Value>) -> Self {
        Self {
            values,
            record_id: None,
        }
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn value(&self, i: usize) -> Option<&Value> {
        self.values.get(i)
    }

    pub fn record_id(&self) -> Option<RecordId> {
        self.record_id
    }

    pub fn set_record_id(&mut self, rid: RecordId) {
        self.record_id = Some(rid);
    }

    /// Whether the values fit the schema. `Null` fits any column.
    pub fn matches(&self, desc: &TupleDesc) -> bool {
        self.values.len() == desc.num_fields()
            && self.values.iter().enumerate().all(|(i, v)| {
                v.data_type()
                    .map_or(true, |t| Some(t) == desc.field_type(i))
            })
    }

    /// Concatenate two tuples, left values first. Used by joins.
    pub fn combine(left: &Tuple, right: &Tuple) -> Tuple {
        let mut values = left.values.clone();
        values.extend(right.values.iter().cloned());
        Tuple::new(values)
    }

    pub fn to_bytes(&self) -> bincode::Result<Vec<u8>> {
        bincode::serialize(&self.values)
    }

    pub fn from_bytes(bytes: &[u8]) -> bincode::Result<Tuple> {
        Ok(Tuple::new(bincode::deserialize(bytes)?))
    }
}
