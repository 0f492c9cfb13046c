//! # sales_store
//!
//! `sales_store` loads a sales CSV into an in-memory columnar table, enriches
//! it with derived columns, and answers a fixed set of analytical questions
//! with grouping, windowing and ranking. It supports:
//!
//! - Memory-mapped CSV loading, parsed in parallel chunks with Rayon
//! - An explicit, declared schema (Date, Int64, Float64, Str; all nullable)
//! - Immutable tables: every step returns a new table
//! - Group-by aggregation: sum, count, average, min, max
//! - Window functions: row number, dense rank, lag, running sum
//!
//! # Features
//!
//! - **Column Deriver**: eight ordered per-row passes ([`processor::derive`])
//! - **Query Engine**: eleven read-only queries ([`processor::queries`])
//! - **Pipeline**: load, enrich, register a temp view, query ([`pipeline`])
//!
//! # Example
//!
//! ```rust,no_run
//! use sales_store::pipeline::{Pipeline, PipelineConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut pipeline = Pipeline::new(PipelineConfig::new("SalesStore.csv"));
//!     let report = pipeline.run()?;
//!
//!     println!("{}", report.enriched.preview(5));
//!     for (query, result) in &report.results {
//!         println!("{query}\n{}", result.preview(5));
//!     }
//!
//!     Ok(())
//! }
//! ```

mod helpers;
pub mod pipeline;
pub mod processor;

pub use pipeline::{Pipeline, PipelineConfig, PipelineReport};
pub use processor::{
    ProcessorError, Value, derive::derive_all, loader::LoadOptions, queries::Query,
    schema::Schema, table::Table,
};
