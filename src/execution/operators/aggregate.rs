// Aggregate Operator
//
// Computes one aggregate over a child, optionally grouped by a single
// field. Groups are kept in insertion order.

use linked_hash_map::LinkedHashMap;

use crate::execution::error::{ExecResult, ExecutionError};
use crate::execution::operators::Operator;
use crate::tuple::{Column, DataType, Tuple, TupleDesc, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFn {
    Min,
    Max,
    Sum,
    Avg,
    Count,
}

impl AggregateFn {
    fn name(self) -> &'static str {
        match self {
            AggregateFn::Min => "min",
            AggregateFn::Max => "max",
            AggregateFn::Sum => "sum",
            AggregateFn::Avg => "avg",
            AggregateFn::Count => "count",
        }
    }
}

/// Running state for one group
#[derive(Default)]
struct AggState {
    count: i64,
    sum_int: i64,
    sum_float: f64,
    min: Option<Value>,
    max: Option<Value>,
}

impl AggState {
    fn update(&mut self, value: &Value) {
        self.count += 1;
        match value {
            Value::Integer(i) => {
                self.sum_int += i;
                self.sum_float += *i as f64;
            }
            Value::Float(f) => {
                self.sum_float += f;
            }
            _ => {}
        }

        let replace_min = match &self.min {
            Some(current) => matches!(
                value.partial_cmp(current),
                Some(std::cmp::Ordering::Less)
            ),
            None => true,
        };
        if replace_min {
            self.min = Some(value.clone());
        }

        let replace_max = match &self.max {
            Some(current) => matches!(
                value.partial_cmp(current),
                Some(std::cmp::Ordering::Greater)
            ),
            None => true,
        };
        if replace_max {
            self.max = Some(value.clone());
        }
    }

    fn result(&self, func: AggregateFn, input_type: DataType) -> Value {
        match func {
            AggregateFn::Count => Value::Integer(self.count),
            AggregateFn::Min => self.min.clone().unwrap_or(Value::Null),
            AggregateFn::Max => self.max.clone().unwrap_or(Value::Null),
            AggregateFn::Sum => match input_type {
                DataType::Integer => Value::Integer(self.sum_int),
                _ => Value::Float(self.sum_float),
            },
            AggregateFn::Avg => {
                if self.count == 0 {
                    Value::Null
                } else {
                    Value::Float(self.sum_float / self.count as f64)
                }
            }
        }
    }
}

pub struct Aggregate {
    child: Box<dyn Operator>,
    agg_field: usize,
    group_by: Option<usize>,
    func: AggregateFn,
    input_type: DataType,
    desc: TupleDesc,
    results: Vec<Tuple>,
    cursor: usize,
    opened: bool,
}

impl Aggregate {
    pub fn new(
        func: AggregateFn,
        agg_field: usize,
        group_by: Option<usize>,
        child: Box<dyn Operator>,
    ) -> ExecResult<Self> {
        let child_desc = child.tuple_desc();
        let input_type = child_desc
            .field_type(agg_field)
            .ok_or(ExecutionError::FieldOutOfRange(agg_field))?;

        // Only COUNT makes sense over non-numeric fields
        if func != AggregateFn::Count
            && !matches!(input_type, DataType::Integer | DataType::Float)
        {
            return Err(ExecutionError::TypeMismatch(format!(
                "{} over non-numeric field {}",
                func.name(),
                agg_field
            )));
        }

        let output_type = match func {
            AggregateFn::Count => DataType::Integer,
            AggregateFn::Avg => DataType::Float,
            _ => input_type,
        };
        let agg_name = format!(
            "{}({})",
            func.name(),
            child_desc.field_name(agg_field).unwrap_or("?")
        );

        let mut columns = Vec::new();
        if let Some(group_field) = group_by {
            let group_type = child_desc
                .field_type(group_field)
                .ok_or(ExecutionError::FieldOutOfRange(group_field))?;
            let group_name = child_desc.field_name(group_field).unwrap_or("?").to_string();
            columns.push(Column::new(group_name, group_type));
        }
        columns.push(Column::new(agg_name, output_type));

        Ok(Self {
            child,
            agg_field,
            group_by,
            func,
            input_type,
            desc: TupleDesc::new(columns),
            results: Vec::new(),
            cursor: 0,
            opened: false,
        })
    }
}

impl Operator for Aggregate {
    fn open(&mut self) -> ExecResult<()> {
        self.child.open()?;

        // Drain the child up front; insertion order of groups is preserved
        let mut groups: LinkedHashMap<Option<Value>, AggState> = LinkedHashMap::new();
        while let Some(tuple) = self.child.next()? {
            let value = tuple
                .value(self.agg_field)
                .ok_or(ExecutionError::FieldOutOfRange(self.agg_field))?;
            if *value == Value::Null {
                continue;
            }

            let key = match self.group_by {
                Some(group_field) => Some(
                    tuple
                        .value(group_field)
                        .ok_or(ExecutionError::FieldOutOfRange(group_field))?
                        .clone(),
                ),
                None => None,
            };
            groups.entry(key).or_insert_with(AggState::default).update(value);
        }

        self.results = groups
            .into_iter()
            .map(|(key, state)| {
                let agg_value = state.result(self.func, self.input_type);
                match key {
                    Some(group_value) => Tuple::new(vec![group_value, agg_value]),
                    None => Tuple::new(vec![agg_value]),
                }
            })
            .collect();

        // An ungrouped aggregate over an empty input still yields one row
        if self.results.is_empty() && self.group_by.is_none() {
            let empty = AggState::default();
            self.results
                .push(Tuple::new(vec![empty.result(self.func, self.input_type)]));
        }

        self.cursor = 0;
        self.opened = true;
        Ok(())
    }

    fn next(&mut self) -> ExecResult<Option<Tuple>> {
        if !self.opened {
            return Err(ExecutionError::NotOpen);
        }
        if self.cursor < self.results.len() {
            let tuple = self.results[self.cursor].clone();
            self.cursor += 1;
            Ok(Some(tuple))
        } else {
            Ok(None)
        }
    }

    fn rewind(&mut self) -> ExecResult<()> {
        if !self.opened {
            return Err(ExecutionError::NotOpen);
        }
        self.cursor = 0;
        Ok(())
    }

    fn close(&mut self) -> ExecResult<()> {
        self.results.clear();
        self.opened = false;
        self.child.close()
    }

    fn tuple_desc(&self) -> &TupleDesc {
        &self.desc
    }
}
