use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::warn;
use sales_store::{
    Pipeline, PipelineConfig, Query,
    processor::{derive::Derivation, loader::LoadOptions},
};

#[cfg(not(target_env = "msvc"))]
use jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

/// Enrich a sales CSV and print the result of each analysis step
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the sales CSV (header row required)
    #[arg(short, long)]
    path: PathBuf,

    /// Field delimiter
    #[arg(short, long, default_value_t = ',')]
    delimiter: char,

    /// chrono format of Order_Date and Ship_Date
    #[arg(long, default_value = "%Y-%m-%d")]
    date_format: String,

    /// Rows shown per preview
    #[arg(long, default_value_t = 5)]
    preview_rows: usize,

    /// Temp view the enriched table is registered under
    #[arg(long, default_value = "a_df")]
    view_name: String,

    /// Run only this query (repeatable); all queries by default
    #[arg(short, long)]
    query: Vec<Query>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    if !args.delimiter.is_ascii() {
        bail!("delimiter must be a single ASCII character");
    }

    let mut config = PipelineConfig::new(&args.path);
    config.load = LoadOptions {
        delimiter: args.delimiter as u8,
        date_format: args.date_format,
    };
    config.view_name = args.view_name;
    if !args.query.is_empty() {
        config.queries = args.query;
    }

    let mut pipeline = Pipeline::new(config);
    let report = pipeline
        .run()
        .with_context(|| format!("running pipeline on {}", args.path.display()))?;

    if !report.summary.errors.is_empty() {
        warn!(
            "{} fields or lines could not be parsed and were nulled or dropped",
            report.summary.errors.len()
        );
    }

    let derived: Vec<&str> = Derivation::ALL.iter().map(|d| d.column_name()).collect();
    println!(
        "Enriched table ({} rows, derived: {})",
        report.enriched.row_count(),
        derived.join(", ")
    );
    println!("{}", report.enriched.preview(args.preview_rows));

    for (query, result) in &report.results {
        println!("# {} [{}]", query.question(), query);
        println!("{}", result.preview(args.preview_rows));
    }

    Ok(())
}
