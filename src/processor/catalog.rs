use log::debug;
use std::collections::HashMap;
use std::sync::Arc;

use crate::processor::{ProcessorError, table::Table};

/// Named temp views over finished tables
#[derive(Debug, Default)]
pub struct Catalog {
    views: HashMap<String, Arc<Table>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `table` under `name`, returning the view it replaced.
    pub fn create_or_replace_temp_view(&mut self, name: &str, table: Table) -> Option<Arc<Table>> {
        debug!("registering view {name} ({} rows)", table.row_count());
        self.views.insert(name.to_string(), Arc::new(table))
    }

    pub fn table(&self, name: &str) -> Result<Arc<Table>, ProcessorError> {
        self.views
            .get(name)
            .cloned()
            .ok_or_else(|| ProcessorError::MissingView(name.to_string()))
    }

    pub fn view_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.views.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::column::Column;

    fn one_row(v: i64) -> Table {
        Table::new(vec!["v".to_string()], vec![Column::Int64(vec![Some(v)])]).unwrap()
    }

    #[test]
    fn test_create_or_replace() {
        let mut catalog = Catalog::new();
        assert!(catalog.create_or_replace_temp_view("a_df", one_row(1)).is_none());
        let replaced = catalog.create_or_replace_temp_view("a_df", one_row(2));
        assert_eq!(replaced.map(|t| t.row(0)), Some(vec![crate::processor::Value::Int(1)]));
        assert_eq!(
            catalog.table("a_df").unwrap().row(0),
            vec![crate::processor::Value::Int(2)]
        );
        assert_eq!(catalog.view_names(), vec!["a_df"]);
    }

    #[test]
    fn test_missing_view() {
        let mut catalog = Catalog::new();
        catalog.create_or_replace_temp_view("x", one_row(1));
        assert!(matches!(catalog.table("y"), Err(ProcessorError::MissingView(n)) if n == "y"));
    }
}
