use chrono::NaiveDate;
use std::cmp::Ordering;
use std::fmt;
use std::hash::Hash;
use std::hash::Hasher;
use thiserror::Error;

pub mod catalog;
pub mod column;
pub mod derive;
pub mod loader;
pub mod queries;
pub mod query_builder;
pub mod schema;
pub mod table;
pub mod window;

/// Error type used across the crate
#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("UTF8 error: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("Schema/parse error: {0}")]
    Parse(String),

    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("Column {column} has type {actual:?}, expected {expected}")]
    TypeMismatch {
        column: String,
        actual: column::ColumnType,
        expected: &'static str,
    },

    #[error("Column {column} has {actual} rows, table has {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },

    #[error("Row count changed from {before} to {after}")]
    RowCountChanged { before: usize, after: usize },

    #[error("No temp view named {0}")]
    MissingView(String),
}

#[derive(Debug, Default)]
pub struct ParseSummary {
    pub rows_processed: usize,
    pub errors: Vec<ParseError>,
}

/// A field or line the loader could not coerce. The row number is 1-based
/// and counts the header line.
#[derive(Debug, Clone)]
pub struct ParseError {
    pub row: usize,
    pub column: String,
    pub value: String,
    pub error: Option<String>,
}

/// A single cell. Every column is nullable.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    Str(String),
    Date(NaiveDate),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// Ordering used by sorts and window frames. Null sorts first; ints and
    /// floats compare numerically with each other.
    pub fn total_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Null, _) => Ordering::Less,
            (_, Value::Null) => Ordering::Greater,
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Str(a), Value::Str(b)) => a.cmp(b),
            (Value::Date(a), Value::Date(b)) => a.cmp(b),
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => normalize(x).total_cmp(&normalize(y)),
                _ => a.rank().cmp(&b.rank()),
            },
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Int(_) | Value::Float(_) => 1,
            Value::Str(_) => 2,
            Value::Date(_) => 3,
        }
    }
}

fn normalize(v: f64) -> f64 {
    if v == 0.0 { 0.0 } else { v }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => normalize(*a).to_bits() == normalize(*b).to_bits(),
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Int(v) => v.hash(state),
            Value::Float(v) => normalize(*v).to_bits().hash(state),
            Value::Str(v) => v.hash(state),
            Value::Date(v) => v.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Int(v) => write!(f, "{v}"),
            // Whole floats keep a trailing ".0" like the JVM prints them
            Value::Float(v) if v.is_finite() && v.fract() == 0.0 => write!(f, "{v:.1}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Str(s) => f.write_str(s),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

/// Filter predicate
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FilterPredicate {
    Equals(Value),
    GreaterThan(Value),
    LessThan(Value),
    Between(Value, Value),
}

impl FilterPredicate {
    /// Comparisons against null are never true.
    pub fn matches(&self, value: &Value) -> bool {
        if value.is_null() {
            return false;
        }
        match self {
            FilterPredicate::Equals(target) => {
                !target.is_null() && value.total_cmp(target) == Ordering::Equal
            }
            FilterPredicate::GreaterThan(target) => {
                !target.is_null() && value.total_cmp(target) == Ordering::Greater
            }
            FilterPredicate::LessThan(target) => {
                !target.is_null() && value.total_cmp(target) == Ordering::Less
            }
            FilterPredicate::Between(low, high) => {
                !low.is_null()
                    && !high.is_null()
                    && value.total_cmp(low) != Ordering::Less
                    && value.total_cmp(high) != Ordering::Greater
            }
        }
    }
}

/// Aggregate operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateOp {
    /// Sum of non-null numeric values
    Sum,
    /// Count of non-null values
    Count,
    /// Average of non-null numeric values
    Avg,
    /// Minimum value
    Min,
    /// Maximum value
    Max,
}

/// Sort direction for ordered operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Nulls first
    Asc,
    /// Nulls last
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub column: String,
    pub order: SortOrder,
}

impl SortKey {
    pub fn asc(column: &str) -> Self {
        SortKey {
            column: column.to_string(),
            order: SortOrder::Asc,
        }
    }

    pub fn desc(column: &str) -> Self {
        SortKey {
            column: column.to_string(),
            order: SortOrder::Desc,
        }
    }

    pub fn compare(&self, a: &Value, b: &Value) -> Ordering {
        match self.order {
            SortOrder::Asc => a.total_cmp(b),
            SortOrder::Desc => b.total_cmp(a),
        }
    }
}
