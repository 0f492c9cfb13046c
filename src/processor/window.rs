//! Window functions: ROW_NUMBER, DENSE_RANK, LAG and a running SUM.
//!
//! A [`WindowSpec`] splits the table into partitions, orders each one, and
//! evaluates a function per partition. Results are scattered back so the
//! returned column lines up with the table's own row order.

use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use std::collections::HashMap;

use crate::processor::{
    ProcessorError, SortKey, Value,
    column::{Column, ColumnType},
    table::Table,
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WindowSpec {
    partition_by: Vec<String>,
    order_by: Vec<SortKey>,
}

impl WindowSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn partition_by(mut self, columns: &[&str]) -> Self {
        self.partition_by = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn order_by(mut self, keys: Vec<SortKey>) -> Self {
        self.order_by = keys;
        self
    }

    /// Row indices per partition, partitions in order of first appearance
    pub fn partitions(&self, table: &Table) -> Result<Vec<Vec<usize>>, ProcessorError> {
        let rows = 0..table.row_count();
        if self.partition_by.is_empty() {
            return Ok(vec![rows.collect()]);
        }

        let key_cols = self
            .partition_by
            .iter()
            .map(|c| table.column(c))
            .collect::<Result<Vec<_>, _>>()?;

        let mut index: HashMap<Vec<Value>, usize> = HashMap::new();
        let mut partitions: Vec<Vec<usize>> = Vec::new();
        for row in rows {
            let key: Vec<Value> = key_cols.iter().map(|c| c.get(row)).collect();
            let slot = *index.entry(key).or_insert_with(|| {
                partitions.push(Vec::new());
                partitions.len() - 1
            });
            partitions[slot].push(row);
        }
        Ok(partitions)
    }

    /// Runs `f` on every ordered partition and scatters its per-row output
    /// back to table order.
    fn over<F>(&self, table: &Table, f: F) -> Result<Vec<Value>, ProcessorError>
    where
        F: Fn(&[usize]) -> Result<Vec<Value>, ProcessorError> + Sync,
    {
        let order_cols: Vec<&str> = self.order_by.iter().map(|k| k.column.as_str()).collect();
        table.require(&order_cols)?;

        let partitions = self.partitions(table)?;
        let evaluated = partitions
            .par_iter()
            .map(|rows| {
                let ordered = table.sorted_rows(rows.clone(), &self.order_by)?;
                let values = f(ordered.as_slice())?;
                Ok(ordered.into_iter().zip(values).collect::<Vec<_>>())
            })
            .collect::<Result<Vec<_>, ProcessorError>>()?;

        let mut out = vec![Value::Null; table.row_count()];
        for (row, value) in evaluated.into_iter().flatten() {
            out[row] = value;
        }
        Ok(out)
    }

    /// True when two rows are peers, i.e. equal on every order key
    fn peers(&self, table: &Table, a: usize, b: usize) -> Result<bool, ProcessorError> {
        for key in &self.order_by {
            let col = table.column(&key.column)?;
            if col.get(a) != col.get(b) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// ROW_NUMBER: 1, 2, 3, ... in partition order
    pub fn row_number(&self, table: &Table) -> Result<Column, ProcessorError> {
        let values = self.over(table, |ordered| {
            Ok((1..=ordered.len() as i64).map(Value::Int).collect())
        })?;
        Column::from_values("row_number", ColumnType::Int64, values)
    }

    /// DENSE_RANK: peers share a rank, the next distinct value gets rank + 1
    pub fn dense_rank(&self, table: &Table) -> Result<Column, ProcessorError> {
        let values = self.over(table, |ordered| {
            let mut ranks = Vec::with_capacity(ordered.len());
            let mut current_rank = 0i64;
            for (i, &row) in ordered.iter().enumerate() {
                if i == 0 || !self.peers(table, ordered[i - 1], row)? {
                    current_rank += 1;
                }
                ranks.push(Value::Int(current_rank));
            }
            Ok(ranks)
        })?;
        Column::from_values("dense_rank", ColumnType::Int64, values)
    }

    /// LAG: value of `column` from `offset` rows earlier, null before the start
    pub fn lag(&self, table: &Table, column: &str, offset: usize) -> Result<Column, ProcessorError> {
        let col = table.column(column)?;
        let values = self.over(table, |ordered| {
            Ok((0..ordered.len())
                .map(|i| {
                    if i < offset {
                        Value::Null
                    } else {
                        col.get(ordered[i - offset])
                    }
                })
                .collect())
        })?;
        Column::from_values(column, col.col_type(), values)
    }

    /// SUM over `RANGE BETWEEN UNBOUNDED PRECEDING AND CURRENT ROW`: each row
    /// sees every earlier row plus all of its peers. Nulls are skipped; a
    /// frame with no values is null. Integer sums wrap on overflow.
    pub fn running_sum(&self, table: &Table, column: &str) -> Result<Column, ProcessorError> {
        let col = table.column(column)?;
        let out_type = match col.col_type() {
            ColumnType::Int64 => ColumnType::Int64,
            ColumnType::Float64 => ColumnType::Float64,
            actual => {
                return Err(ProcessorError::TypeMismatch {
                    column: column.to_string(),
                    actual,
                    expected: "a numeric column",
                });
            }
        };

        let values = self.over(table, |ordered| {
            let mut sums = vec![Value::Null; ordered.len()];
            let mut acc = Value::Null;
            let mut start = 0;
            while start < ordered.len() {
                // extend to the last peer of ordered[start]
                let mut end = start + 1;
                while end < ordered.len() && self.peers(table, ordered[start], ordered[end])? {
                    end += 1;
                }
                for &row in &ordered[start..end] {
                    acc = match (acc, col.get(row)) {
                        (acc, Value::Null) => acc,
                        (Value::Null, v) => v,
                        (Value::Int(a), Value::Int(b)) => Value::Int(a.wrapping_add(b)),
                        (a, b) => {
                            Value::Float(a.as_f64().unwrap_or(0.0) + b.as_f64().unwrap_or(0.0))
                        }
                    };
                }
                for slot in &mut sums[start..end] {
                    *slot = acc.clone();
                }
                start = end;
            }
            Ok(sums)
        })?;
        Column::from_values(column, out_type, values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_table() -> Table {
        Table::new(
            vec!["part".to_string(), "key".to_string(), "val".to_string()],
            vec![
                Column::Str(vec![
                    Some("a".into()),
                    Some("b".into()),
                    Some("a".into()),
                    Some("a".into()),
                    Some("a".into()),
                ]),
                Column::Int64(vec![Some(3), Some(1), Some(1), Some(2), Some(2)]),
                Column::Float64(vec![Some(30.0), Some(100.0), Some(10.0), Some(20.0), None]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_dense_rank_desc_no_gaps() {
        let table = make_table();
        let ranks = WindowSpec::new()
            .order_by(vec![SortKey::desc("key")])
            .dense_rank(&table)
            .unwrap();
        // key 3 -> 1, key 2 -> 2 (twice), key 1 -> 3 (twice)
        assert_eq!(
            ranks,
            Column::Int64(vec![Some(1), Some(3), Some(3), Some(2), Some(2)])
        );
    }

    #[test]
    fn test_lag_within_partition() {
        let table = make_table();
        let lagged = WindowSpec::new()
            .partition_by(&["part"])
            .order_by(vec![SortKey::asc("key")])
            .lag(&table, "val", 1)
            .unwrap();
        // partition a ordered by key: rows 2 (1), 3 (2), 4 (2), 0 (3); ties keep input order
        assert_eq!(
            lagged,
            Column::Float64(vec![None, None, None, Some(10.0), Some(20.0)])
        );
    }

    #[test]
    fn test_running_sum_includes_peers() {
        let table = make_table();
        let sums = WindowSpec::new()
            .partition_by(&["part"])
            .order_by(vec![SortKey::asc("key")])
            .running_sum(&table, "val")
            .unwrap();
        assert_eq!(
            sums,
            Column::Float64(vec![Some(60.0), Some(100.0), Some(10.0), Some(30.0), Some(30.0)])
        );
    }

    #[test]
    fn test_running_sum_of_ints_wraps() {
        let table = Table::new(
            vec!["k".to_string(), "n".to_string()],
            vec![
                Column::Int64(vec![Some(1), Some(2)]),
                Column::Int64(vec![Some(i64::MAX), Some(1)]),
            ],
        )
        .unwrap();
        let sums = WindowSpec::new()
            .order_by(vec![SortKey::asc("k")])
            .running_sum(&table, "n")
            .unwrap();
        assert_eq!(sums, Column::Int64(vec![Some(i64::MAX), Some(i64::MIN)]));
    }

    #[test]
    fn test_row_number() {
        let table = make_table();
        let numbers = WindowSpec::new()
            .partition_by(&["part"])
            .order_by(vec![SortKey::asc("key")])
            .row_number(&table)
            .unwrap();
        assert_eq!(
            numbers,
            Column::Int64(vec![Some(4), Some(1), Some(1), Some(2), Some(3)])
        );
    }

    #[test]
    fn test_unknown_order_column() {
        let table = make_table();
        let res = WindowSpec::new()
            .order_by(vec![SortKey::asc("missing")])
            .row_number(&table);
        assert!(matches!(res, Err(ProcessorError::MissingColumn(_))));
    }
}
