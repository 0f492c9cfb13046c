use std::collections::HashSet;
use std::fmt;

use crate::processor::{
    FilterPredicate, ProcessorError, SortKey, Value,
    column::{Column, ColumnType},
};

/// An immutable, in-memory columnar table.
///
/// Every transformation returns a new `Table`; nothing mutates a table once
/// it has been built.
///
/// # Example
///
/// ```rust
/// # use sales_store::processor::{table::Table, column::Column};
/// let table = Table::new(
///     vec!["Region".to_string()],
///     vec![Column::Str(vec![Some("East".into())])],
/// ).unwrap();
/// assert_eq!(table.row_count(), 1);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    headers: Vec<String>,
    columns: Vec<Column>,
    row_count: usize,
}

impl Table {
    /// Builds a table from parallel header and column lists
    ///
    /// # Errors
    /// Returns [`ProcessorError::LengthMismatch`] if the columns differ in
    /// length, or [`ProcessorError::Parse`] on a header/column count mismatch
    /// or a duplicated header.
    pub fn new(headers: Vec<String>, columns: Vec<Column>) -> Result<Self, ProcessorError> {
        if headers.len() != columns.len() {
            return Err(ProcessorError::Parse(format!(
                "Header/column mismatch: {} vs {}",
                headers.len(),
                columns.len()
            )));
        }

        let mut seen = HashSet::new();
        if let Some(dup) = headers.iter().find(|h| !seen.insert(h.as_str())) {
            return Err(ProcessorError::Parse(format!("Duplicate column: {dup}")));
        }

        let row_count = columns.first().map_or(0, Column::len);
        for (name, col) in headers.iter().zip(&columns) {
            if col.len() != row_count {
                return Err(ProcessorError::LengthMismatch {
                    column: name.clone(),
                    expected: row_count,
                    actual: col.len(),
                });
            }
        }

        Ok(Table {
            headers,
            columns,
            row_count,
        })
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn column_type(&self, name: &str) -> Result<ColumnType, ProcessorError> {
        Ok(self.column(name)?.col_type())
    }

    fn position(&self, name: &str) -> Result<usize, ProcessorError> {
        self.headers
            .iter()
            .position(|cn| cn == name)
            .ok_or_else(|| ProcessorError::MissingColumn(name.to_string()))
    }

    pub fn column(&self, name: &str) -> Result<&Column, ProcessorError> {
        let pos = self.position(name)?;
        Ok(&self.columns[pos])
    }

    /// Fails with the first name that does not resolve.
    pub fn require(&self, names: &[&str]) -> Result<(), ProcessorError> {
        names.iter().try_for_each(|n| self.position(n).map(|_| ()))
    }

    pub fn value(&self, name: &str, row: usize) -> Result<Value, ProcessorError> {
        Ok(self.column(name)?.get(row))
    }

    pub fn row(&self, row: usize) -> Vec<Value> {
        self.columns.iter().map(|c| c.get(row)).collect()
    }

    /// Returns a new table with `name` replaced in place, or appended when
    /// it does not exist yet.
    pub fn with_column(&self, name: &str, column: Column) -> Result<Table, ProcessorError> {
        if column.len() != self.row_count && !self.columns.is_empty() {
            return Err(ProcessorError::LengthMismatch {
                column: name.to_string(),
                expected: self.row_count,
                actual: column.len(),
            });
        }

        let mut headers = self.headers.clone();
        let mut columns = self.columns.clone();
        match headers.iter().position(|h| h == name) {
            Some(pos) => columns[pos] = column,
            None => {
                headers.push(name.to_string());
                columns.push(column);
            }
        }
        Table::new(headers, columns)
    }

    pub fn select(&self, names: &[&str]) -> Result<Table, ProcessorError> {
        let mut columns = Vec::with_capacity(names.len());
        for name in names {
            columns.push(self.column(name)?.clone());
        }
        Table::new(names.iter().map(|s| s.to_string()).collect(), columns)
    }

    pub fn drop_column(&self, name: &str) -> Result<Table, ProcessorError> {
        let pos = self.position(name)?;
        let mut headers = self.headers.clone();
        let mut columns = self.columns.clone();
        headers.remove(pos);
        columns.remove(pos);
        Table::new(headers, columns)
    }

    /// Gathers the given rows, in the given order.
    pub fn take(&self, rows: &[usize]) -> Table {
        Table {
            headers: self.headers.clone(),
            columns: self.columns.iter().map(|c| c.take(rows)).collect(),
            row_count: rows.len(),
        }
    }

    /// Row indices where `column` satisfies `predicate`
    pub fn filter_rows(
        &self,
        column: &str,
        predicate: &FilterPredicate,
    ) -> Result<Vec<usize>, ProcessorError> {
        let col = self.column(column)?;
        Ok((0..self.row_count)
            .filter(|&i| predicate.matches(&col.get(i)))
            .collect())
    }

    pub fn filter(&self, column: &str, predicate: &FilterPredicate) -> Result<Table, ProcessorError> {
        let rows = self.filter_rows(column, predicate)?;
        Ok(self.take(&rows))
    }

    /// Drops repeated rows, keeping the first occurrence of each.
    pub fn distinct(&self) -> Table {
        let mut seen = HashSet::with_capacity(self.row_count);
        let rows: Vec<usize> = (0..self.row_count)
            .filter(|&i| seen.insert(self.row(i)))
            .collect();
        self.take(&rows)
    }

    /// Stable sort on the given keys.
    pub fn sort_by(&self, keys: &[SortKey]) -> Result<Table, ProcessorError> {
        let rows: Vec<usize> = (0..self.row_count).collect();
        let rows = self.sorted_rows(rows, keys)?;
        Ok(self.take(&rows))
    }

    /// Stable sort of a subset of row indices on the given keys.
    pub fn sorted_rows(
        &self,
        mut rows: Vec<usize>,
        keys: &[SortKey],
    ) -> Result<Vec<usize>, ProcessorError> {
        let cols = keys
            .iter()
            .map(|k| self.column(&k.column))
            .collect::<Result<Vec<_>, _>>()?;

        rows.sort_by(|&a, &b| {
            keys.iter()
                .zip(&cols)
                .map(|(key, col)| key.compare(&col.get(a), &col.get(b)))
                .find(|o| o.is_ne())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(rows)
    }

    /// Displayable view of the first `n` rows
    pub fn preview(&self, n: usize) -> Preview<'_> {
        Preview { table: self, n }
    }
}

/// Bordered grid of the first rows of a table, values untruncated
pub struct Preview<'a> {
    table: &'a Table,
    n: usize,
}

impl fmt::Display for Preview<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shown = self.n.min(self.table.row_count);
        let cells: Vec<Vec<String>> = (0..shown)
            .map(|i| self.table.row(i).iter().map(|v| v.to_string()).collect())
            .collect();

        let widths: Vec<usize> = self
            .table
            .headers
            .iter()
            .enumerate()
            .map(|(c, h)| {
                cells
                    .iter()
                    .map(|row| row[c].chars().count())
                    .chain(std::iter::once(h.chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let border: String = widths
            .iter()
            .map(|w| format!("+{}", "-".repeat(*w)))
            .collect::<String>()
            + "+";

        writeln!(f, "{border}")?;
        for (h, &w) in self.table.headers.iter().zip(&widths) {
            write!(f, "|{h:<w$}")?;
        }
        writeln!(f, "|")?;
        writeln!(f, "{border}")?;
        for row in &cells {
            for (cell, &w) in row.iter().zip(&widths) {
                write!(f, "|{cell:<w$}")?;
            }
            writeln!(f, "|")?;
        }
        writeln!(f, "{border}")?;
        if self.table.row_count > shown {
            writeln!(f, "only showing top {shown} rows")?;
        }
        Ok(())
    }
}
