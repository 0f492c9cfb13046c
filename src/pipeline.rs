use log::info;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use crate::processor::{
    ParseSummary, ProcessorError,
    catalog::Catalog,
    derive::derive_all,
    loader::{LoadOptions, load_csv},
    queries::Query,
    schema::Schema,
    table::Table,
};

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub path: PathBuf,
    pub schema: Schema,
    pub load: LoadOptions,
    /// Name the enriched table is registered under
    pub view_name: String,
    /// Queries to run, in order
    pub queries: Vec<Query>,
}

impl PipelineConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        PipelineConfig {
            path: path.into(),
            schema: Schema::sales_store(),
            load: LoadOptions::default(),
            view_name: "a_df".to_string(),
            queries: Query::ALL.to_vec(),
        }
    }
}

#[derive(Debug)]
pub struct PipelineReport {
    pub summary: ParseSummary,
    pub enriched: Arc<Table>,
    pub results: Vec<(Query, Table)>,
}

/// Load, enrich, register, then query.
#[derive(Debug)]
pub struct Pipeline {
    config: PipelineConfig,
    catalog: Catalog,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Pipeline {
            config,
            catalog: Catalog::new(),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn run(&mut self) -> Result<PipelineReport, ProcessorError> {
        let (base, summary) = load_csv(&self.config.path, &self.config.schema, &self.config.load)?;
        let (enriched, results) = self.run_table(&base)?;
        Ok(PipelineReport {
            summary,
            enriched,
            results,
        })
    }

    /// Everything after loading: enrich `base`, register it, run the queries.
    pub fn run_table(
        &mut self,
        base: &Table,
    ) -> Result<(Arc<Table>, Vec<(Query, Table)>), ProcessorError> {
        let started = Instant::now();
        let enriched = derive_all(base)?;
        info!(
            "enriched {} rows with {} columns in {:?}",
            enriched.row_count(),
            enriched.headers().len(),
            started.elapsed()
        );

        self.catalog
            .create_or_replace_temp_view(&self.config.view_name, enriched);
        let view = self.catalog.table(&self.config.view_name)?;

        let mut results = Vec::with_capacity(self.config.queries.len());
        for query in &self.config.queries {
            let started = Instant::now();
            let result = query.run(&view)?;
            info!(
                "{query}: {} rows in {:?}",
                result.row_count(),
                started.elapsed()
            );
            results.push((*query, result));
        }

        Ok((view, results))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::column::Column;

    #[test]
    fn test_run_table_registers_view() {
        let schema = Schema::sales_store();
        let headers: Vec<String> = schema.fields().iter().map(|f| f.name.clone()).collect();
        let columns = schema.fields().iter().map(|f| Column::new(f.col_type)).collect();
        let base = Table::new(headers, columns).unwrap();

        let mut config = PipelineConfig::new("unused.csv");
        config.view_name = "sales".to_string();
        let mut pipeline = Pipeline::new(config);
        let (enriched, results) = pipeline.run_table(&base).unwrap();

        assert_eq!(enriched.row_count(), 0);
        assert_eq!(results.len(), Query::ALL.len());
        assert_eq!(pipeline.catalog().view_names(), vec!["sales"]);
    }
}
