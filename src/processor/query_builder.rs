use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use std::collections::HashMap;

use crate::processor::{
    AggregateOp, FilterPredicate, ProcessorError, Value,
    column::{Column, ColumnType},
    table::Table,
};

/// One named output measure. `column: None` counts rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregation {
    pub column: Option<String>,
    pub op: AggregateOp,
    pub alias: String,
}

/// Group-by query builder over a [`Table`]
///
/// Filters apply before grouping. The result is a new table holding the
/// group key columns followed by one column per aggregation, one row per
/// group in order of first appearance.
///
/// # Example
/// ```rust
/// # use sales_store::processor::{AggregateOp, table::Table, column::Column, Value};
/// let table = Table::new(
///     vec!["State".into(), "Order_Value".into()],
///     vec![
///         Column::Str(vec![Some("Ohio".into()), Some("Ohio".into())]),
///         Column::Float64(vec![Some(10.0), Some(30.0)]),
///     ],
/// ).unwrap();
/// let result = table
///     .query()
///     .group_by("State")
///     .aggregate_as("Order_Value", AggregateOp::Max, "Highest_Order_Value")
///     .execute()
///     .unwrap();
/// assert_eq!(result.value("Highest_Order_Value", 0).unwrap(), Value::Float(30.0));
/// ```
#[derive(Debug, Clone)]
pub struct QueryBuilder<'a> {
    table: &'a Table,
    filters: Vec<(String, FilterPredicate)>,
    group_by_columns: Vec<String>,
    aggregations: Vec<Aggregation>,
}

impl<'a> QueryBuilder<'a> {
    pub fn new(table: &'a Table) -> Self {
        Self {
            table,
            filters: Vec::new(),
            group_by_columns: Vec::new(),
            aggregations: Vec::new(),
        }
    }

    /// Add a filter condition
    pub fn filter(mut self, column: &str, predicate: FilterPredicate) -> Self {
        self.filters.push((column.to_string(), predicate));
        self
    }

    /// Add a single group-by column
    pub fn group_by(mut self, column: &str) -> Self {
        self.group_by_columns.push(column.to_string());
        self
    }

    /// Add multiple group-by columns
    pub fn group_by_multi(mut self, columns: Vec<&str>) -> Self {
        for col in columns {
            self.group_by_columns.push(col.to_string());
        }
        self
    }

    /// Add an aggregation with a custom alias
    pub fn aggregate_as(mut self, column: &str, op: AggregateOp, alias: &str) -> Self {
        self.aggregations.push(Aggregation {
            column: Some(column.to_string()),
            op,
            alias: alias.to_string(),
        });
        self
    }

    /// Count rows per group, nulls included
    pub fn count_rows_as(mut self, alias: &str) -> Self {
        self.aggregations.push(Aggregation {
            column: None,
            op: AggregateOp::Count,
            alias: alias.to_string(),
        });
        self
    }

    /// Execute the query
    pub fn execute(self) -> Result<Table, ProcessorError> {
        self.check_columns()?;

        let rows = self.apply_filters()?;
        let groups = self.group_rows(rows)?;

        let mut headers = self.group_by_columns.clone();
        let mut columns = Vec::with_capacity(headers.len() + self.aggregations.len());

        let first_rows: Vec<usize> = groups.iter().filter_map(|g| g.first().copied()).collect();
        for name in &self.group_by_columns {
            columns.push(self.table.column(name)?.take(&first_rows));
        }

        for agg in &self.aggregations {
            let out_type = self.output_type(agg)?;
            let values = groups
                .par_iter()
                .map(|group| self.aggregate_rows(agg, group))
                .collect::<Result<Vec<Value>, ProcessorError>>()?;
            let name = agg.alias.clone();
            columns.push(Column::from_values(&name, out_type, values)?);
            headers.push(name);
        }

        Table::new(headers, columns)
    }

    /// Resolves every referenced column before any work starts
    fn check_columns(&self) -> Result<(), ProcessorError> {
        let names: Vec<&str> = self
            .filters
            .iter()
            .map(|(c, _)| c.as_str())
            .chain(self.group_by_columns.iter().map(String::as_str))
            .chain(self.aggregations.iter().filter_map(|a| a.column.as_deref()))
            .collect();
        self.table.require(&names)
    }

    /// Row indices matching every filter, in ascending order
    fn apply_filters(&self) -> Result<Vec<usize>, ProcessorError> {
        let mut rows: Vec<usize> = (0..self.table.row_count()).collect();
        for (column, predicate) in &self.filters {
            // filter_rows yields ascending indices
            let matching = self.table.filter_rows(column, predicate)?;
            rows.retain(|r| matching.binary_search(r).is_ok());
        }
        Ok(rows)
    }

    /// Row indices per group, groups in order of first appearance. Without
    /// group columns every row forms a single group, even when there are none.
    fn group_rows(&self, rows: Vec<usize>) -> Result<Vec<Vec<usize>>, ProcessorError> {
        if self.group_by_columns.is_empty() {
            return Ok(vec![rows]);
        }

        let key_cols = self
            .group_by_columns
            .iter()
            .map(|c| self.table.column(c))
            .collect::<Result<Vec<_>, _>>()?;

        let mut index: HashMap<Vec<Value>, usize> = HashMap::new();
        let mut groups: Vec<Vec<usize>> = Vec::new();
        for row in rows {
            let key: Vec<Value> = key_cols.iter().map(|c| c.get(row)).collect();
            let slot = *index.entry(key).or_insert_with(|| {
                groups.push(Vec::new());
                groups.len() - 1
            });
            groups[slot].push(row);
        }
        Ok(groups)
    }

    fn output_type(&self, agg: &Aggregation) -> Result<ColumnType, ProcessorError> {
        let Some(column) = &agg.column else {
            return Ok(ColumnType::Int64);
        };
        let input = self.table.column_type(column)?;

        match (agg.op, input) {
            (AggregateOp::Count, _) => Ok(ColumnType::Int64),
            (AggregateOp::Min | AggregateOp::Max, t) => Ok(t),
            (AggregateOp::Sum, ColumnType::Int64) => Ok(ColumnType::Int64),
            (AggregateOp::Sum | AggregateOp::Avg, ColumnType::Int64 | ColumnType::Float64) => {
                Ok(ColumnType::Float64)
            }
            (AggregateOp::Sum | AggregateOp::Avg, actual) => Err(ProcessorError::TypeMismatch {
                column: column.clone(),
                actual,
                expected: "a numeric column",
            }),
        }
    }

    /// Aggregates one group. Nulls are skipped; an all-null group gives null
    /// for every op except the counts.
    fn aggregate_rows(&self, agg: &Aggregation, rows: &[usize]) -> Result<Value, ProcessorError> {
        let Some(column) = &agg.column else {
            return Ok(Value::Int(rows.len() as i64));
        };
        let col = self.table.column(column)?;

        let values: Vec<Value> = rows
            .iter()
            .map(|&i| col.get(i))
            .filter(|v| !v.is_null())
            .collect();

        let result = match agg.op {
            AggregateOp::Count => Some(Value::Int(values.len() as i64)),
            _ if values.is_empty() => None,
            AggregateOp::Min => values.into_iter().min_by(|a, b| a.total_cmp(b)),
            AggregateOp::Max => values.into_iter().max_by(|a, b| a.total_cmp(b)),
            AggregateOp::Sum => match col {
                // wraps on overflow like a non-ANSI long sum
                Column::Int64(_) => Some(Value::Int(values.iter().fold(0i64, |acc, v| match v {
                    Value::Int(x) => acc.wrapping_add(*x),
                    _ => acc,
                }))),
                _ => Some(Value::Float(values.iter().filter_map(Value::as_f64).sum())),
            },
            AggregateOp::Avg => {
                let sum: f64 = values.iter().filter_map(Value::as_f64).sum();
                Some(Value::Float(sum / values.len() as f64))
            }
        };

        Ok(result.unwrap_or(Value::Null))
    }
}

impl Table {
    pub fn query(&self) -> QueryBuilder<'_> {
        QueryBuilder::new(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn make_test_table() -> Table {
        Table::new(
            vec![
                "region".to_string(),
                "category".to_string(),
                "sales".to_string(),
                "quantity".to_string(),
                "date".to_string(),
            ],
            vec![
                Column::Str(vec![
                    Some("East".into()),
                    Some("West".into()),
                    Some("East".into()),
                    None,
                ]),
                Column::Str(vec![
                    Some("A".into()),
                    Some("B".into()),
                    Some("A".into()),
                    Some("B".into()),
                ]),
                Column::Float64(vec![Some(10.0), Some(20.0), Some(30.0), None]),
                Column::Int64(vec![Some(1), Some(2), Some(3), Some(4)]),
                Column::Date(vec![
                    NaiveDate::from_ymd_opt(2024, 1, 1),
                    NaiveDate::from_ymd_opt(2024, 3, 1),
                    NaiveDate::from_ymd_opt(2024, 2, 1),
                    None,
                ]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_group_by_average() {
        let table = make_test_table();
        let res = table
            .query()
            .group_by("region")
            .aggregate_as("sales", AggregateOp::Avg, "sales_avg")
            .execute()
            .unwrap();

        assert_eq!(res.headers(), &["region".to_string(), "sales_avg".to_string()]);
        assert_eq!(res.row_count(), 3);
        assert_eq!(res.value("sales_avg", 0).unwrap(), Value::Float(20.0));
        // null key forms its own group, all-null values average to null
        assert!(res.value("region", 2).unwrap().is_null());
        assert!(res.value("sales_avg", 2).unwrap().is_null());
    }

    #[test]
    fn test_multi_dimensional_query() {
        let table = make_test_table();
        let res = table
            .query()
            .filter("quantity", FilterPredicate::LessThan(Value::Int(4)))
            .group_by_multi(vec!["region", "category"])
            .aggregate_as("sales", AggregateOp::Sum, "sales_sum")
            .aggregate_as("quantity", AggregateOp::Sum, "quantity_sum")
            .count_rows_as("n")
            .execute()
            .unwrap();

        assert_eq!(res.row_count(), 2);
        assert_eq!(res.value("sales_sum", 0).unwrap(), Value::Float(40.0));
        assert_eq!(res.value("quantity_sum", 0).unwrap(), Value::Int(4));
        assert_eq!(res.value("n", 0).unwrap(), Value::Int(2));
    }

    #[test]
    fn test_count_skips_nulls_and_max_keeps_type() {
        let table = make_test_table();
        let res = table
            .query()
            .aggregate_as("sales", AggregateOp::Count, "sales_count")
            .aggregate_as("date", AggregateOp::Max, "date_max")
            .count_rows_as("rows")
            .execute()
            .unwrap();

        assert_eq!(res.value("sales_count", 0).unwrap(), Value::Int(3));
        assert_eq!(res.value("rows", 0).unwrap(), Value::Int(4));
        assert_eq!(
            res.value("date_max", 0).unwrap(),
            Value::Date(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap())
        );
    }

    #[test]
    fn test_filters_intersect() {
        let table = make_test_table();
        let res = table
            .query()
            .filter("quantity", FilterPredicate::GreaterThan(Value::Int(1)))
            .filter("region", FilterPredicate::Equals(Value::Str("East".into())))
            .count_rows_as("n")
            .execute()
            .unwrap();
        assert_eq!(res.value("n", 0).unwrap(), Value::Int(1));
    }

    #[test]
    fn test_int_sum_wraps_on_overflow() {
        let table = Table::new(
            vec!["n".to_string()],
            vec![Column::Int64(vec![Some(i64::MAX), Some(1), None])],
        )
        .unwrap();
        let res = table
            .query()
            .aggregate_as("n", AggregateOp::Sum, "total")
            .execute()
            .unwrap();
        assert_eq!(res.value("total", 0).unwrap(), Value::Int(i64::MIN));
    }

    #[test]
    fn test_sum_of_strings_is_type_error() {
        let table = make_test_table();
        let res = table.query().aggregate_as("region", AggregateOp::Sum, "region_sum").execute();
        assert!(matches!(res, Err(ProcessorError::TypeMismatch { .. })));
    }

    #[test]
    fn test_unknown_column_fails_before_work() {
        let table = make_test_table();
        let res = table
            .query()
            .group_by("nope")
            .aggregate_as("sales", AggregateOp::Sum, "sales_sum")
            .execute();
        assert!(matches!(res, Err(ProcessorError::MissingColumn(c)) if c == "nope"));
    }
}
