use chrono::NaiveDate;

use crate::processor::{ProcessorError, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Int64,
    Float64,
    Str,
    Date,
}

/// A nullable, typed column vector
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Int64(Vec<Option<i64>>),
    Float64(Vec<Option<f64>>),
    Str(Vec<Option<String>>),
    Date(Vec<Option<NaiveDate>>),
}

impl Column {
    pub fn new(col_type: ColumnType) -> Self {
        Self::with_capacity(col_type, 0)
    }

    pub fn with_capacity(col_type: ColumnType, capacity: usize) -> Self {
        match col_type {
            ColumnType::Int64 => Column::Int64(Vec::with_capacity(capacity)),
            ColumnType::Float64 => Column::Float64(Vec::with_capacity(capacity)),
            ColumnType::Str => Column::Str(Vec::with_capacity(capacity)),
            ColumnType::Date => Column::Date(Vec::with_capacity(capacity)),
        }
    }

    /// Builds a column of the given type from loose values. Ints widen into a
    /// float column; anything else that does not fit is a type mismatch.
    pub fn from_values(
        name: &str,
        col_type: ColumnType,
        values: Vec<Value>,
    ) -> Result<Self, ProcessorError> {
        let mut column = Column::with_capacity(col_type, values.len());
        for value in values {
            column.push(name, value)?;
        }
        Ok(column)
    }

    pub fn col_type(&self) -> ColumnType {
        match self {
            Column::Int64(_) => ColumnType::Int64,
            Column::Float64(_) => ColumnType::Float64,
            Column::Str(_) => ColumnType::Str,
            Column::Date(_) => ColumnType::Date,
        }
    }

    pub fn push(&mut self, name: &str, value: Value) -> Result<(), ProcessorError> {
        let col_type = self.col_type();
        let mismatch = || ProcessorError::TypeMismatch {
            column: name.to_string(),
            actual: col_type,
            expected: "a value of the column's type",
        };

        match (self, value) {
            (Column::Int64(v), Value::Null) => v.push(None),
            (Column::Float64(v), Value::Null) => v.push(None),
            (Column::Str(v), Value::Null) => v.push(None),
            (Column::Date(v), Value::Null) => v.push(None),
            (Column::Int64(v), Value::Int(x)) => v.push(Some(x)),
            (Column::Float64(v), Value::Float(x)) => v.push(Some(x)),
            (Column::Float64(v), Value::Int(x)) => v.push(Some(x as f64)),
            (Column::Str(v), Value::Str(x)) => v.push(Some(x)),
            (Column::Date(v), Value::Date(x)) => v.push(Some(x)),
            _ => return Err(mismatch()),
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        match self {
            Column::Int64(v) => v.len(),
            Column::Float64(v) => v.len(),
            Column::Str(v) => v.len(),
            Column::Date(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // Random access
    pub fn get(&self, idx: usize) -> Value {
        match self {
            Column::Int64(v) => v.get(idx).copied().flatten().map_or(Value::Null, Value::Int),
            Column::Float64(v) => v
                .get(idx)
                .copied()
                .flatten()
                .map_or(Value::Null, Value::Float),
            Column::Str(v) => v
                .get(idx)
                .and_then(|s| s.clone())
                .map_or(Value::Null, Value::Str),
            Column::Date(v) => v.get(idx).copied().flatten().map_or(Value::Null, Value::Date),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = Value> + '_ {
        (0..self.len()).map(move |i| self.get(i))
    }

    /// Numeric view of the column; ints widen to f64.
    pub fn as_f64(&self, name: &str) -> Result<Vec<Option<f64>>, ProcessorError> {
        match self {
            Column::Int64(v) => Ok(v.iter().map(|x| x.map(|x| x as f64)).collect()),
            Column::Float64(v) => Ok(v.clone()),
            _ => Err(ProcessorError::TypeMismatch {
                column: name.to_string(),
                actual: self.col_type(),
                expected: "a numeric column",
            }),
        }
    }

    pub fn as_str_slice(&self, name: &str) -> Result<&[Option<String>], ProcessorError> {
        match self {
            Column::Str(v) => Ok(v),
            _ => Err(ProcessorError::TypeMismatch {
                column: name.to_string(),
                actual: self.col_type(),
                expected: "Str",
            }),
        }
    }

    pub fn as_date_slice(&self, name: &str) -> Result<&[Option<NaiveDate>], ProcessorError> {
        match self {
            Column::Date(v) => Ok(v),
            _ => Err(ProcessorError::TypeMismatch {
                column: name.to_string(),
                actual: self.col_type(),
                expected: "Date",
            }),
        }
    }

    /// Gathers the given rows into a new column, in the given order.
    pub fn take(&self, rows: &[usize]) -> Column {
        match self {
            Column::Int64(v) => Column::Int64(rows.iter().map(|&i| v[i]).collect()),
            Column::Float64(v) => Column::Float64(rows.iter().map(|&i| v[i]).collect()),
            Column::Str(v) => Column::Str(rows.iter().map(|&i| v[i].clone()).collect()),
            Column::Date(v) => Column::Date(rows.iter().map(|&i| v[i]).collect()),
        }
    }

    /// Moves the rows of `other` onto the end of this column.
    pub fn append(&mut self, other: Column) -> Result<(), ProcessorError> {
        match (self, other) {
            (Column::Int64(a), Column::Int64(b)) => a.extend(b),
            (Column::Float64(a), Column::Float64(b)) => a.extend(b),
            (Column::Str(a), Column::Str(b)) => a.extend(b),
            (Column::Date(a), Column::Date(b)) => a.extend(b),
            (a, b) => {
                return Err(ProcessorError::Parse(format!(
                    "cannot append {:?} column to {:?} column",
                    b.col_type(),
                    a.col_type()
                )));
            }
        }
        Ok(())
    }
}
