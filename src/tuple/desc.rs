use super::value::DataType;

/// A named, typed column of a table schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub data_type: DataType,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// Schema of a tuple: an ordered list of named, typed columns.
#[derive(Debug, Clone)]
pub struct TupleDesc {
    columns: Vec<Column>,
}

impl TupleDesc {
    pub fn new(columns: Vec<Column>) -> Self {
        Self { columns }
    }

    pub fn num_fields(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn field_name(&self, i: usize) -> Option<&str> {
        self.columns.get(i).map(|c| c.name.as_str())
    }

    pub fn field_type(&self, i: usize) -> Option<DataType> {
        self.columns.get(i).map(|c| c.data_type)
    }

    /// Index of the first column with the given name.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Concatenate two schemas, left columns first. Used by joins.
    pub fn merge(left: &TupleDesc, right: &TupleDesc) -> TupleDesc {
        let mut columns = left.columns.clone();
        columns.extend(right.columns.iter().cloned());
        TupleDesc::new(columns)
    }
}

// Two schemas are interchangeable when their column types line up; names
// don't matter for compatibility.
impl PartialEq for TupleDesc {
    fn eq(&self, other: &Self) -> bool {
        self.columns.len() == other.columns.len()
            && self
                .columns
                .iter()
                .zip(other.columns.iter())
                .all(|(a, b)| a.data_type == b.data_type)
    }
}

impl Eq for TupleDesc {}

#[cfg(test)]
mod tests {
    use super::*;

    fn desc() -> TupleDesc {
        TupleDesc::new(vec![
            Column::new("id", DataType::Integer),
            Column::new("name", DataType::Text),
        ])
    }

    #[test]
    fn test_index_of() {
        let d = desc();
        assert_eq!(d.index_of("name"), Some(1));
        assert_eq!(d.index_of("missing"), None);
    }

    #[test]
    fn test_merge() {
        let merged = TupleDesc::merge(&desc(), &desc());
        assert_eq!(merged.num_fields(), 4);
        assert_eq!(merged.field_name(2), Some("id"));
    }

    #[test]
    fn test_equality_ignores_names() {
        let renamed = TupleDesc::new(vec![
            Column::new("a", DataType::Integer),
            Column::new("b", DataType::Text),
        ]);
        assert_eq!(desc(), renamed);

        let shorter = TupleDesc::new(vec![Column::new("a", DataType::Integer)]);
        assert_ne!(desc(), shorter);
    }
}
