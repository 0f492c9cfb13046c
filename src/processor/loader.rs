use chrono::NaiveDate;
use log::{debug, info, warn};
use memchr::memchr_iter;
use memmap2::Mmap;
use rayon::iter::{IndexedParallelIterator, IntoParallelRefIterator, ParallelIterator};
use std::{borrow::Cow, fs::File, path::Path, str};

use crate::{
    helpers::fields::{split_fields, trim_cr},
    processor::{
        ParseError, ParseSummary, ProcessorError,
        column::{Column, ColumnType},
        schema::Schema,
        table::Table,
    },
};

/// How the delimited text source is read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOptions {
    pub delimiter: u8,
    /// chrono format string used for every `Date` column
    pub date_format: String,
}

impl Default for LoadOptions {
    fn default() -> Self {
        LoadOptions {
            delimiter: b',',
            date_format: "%Y-%m-%d".to_string(),
        }
    }
}

/// Per-chunk parse output, merged in chunk order after the parallel pass
struct BatchResult {
    columns: Vec<Column>,
    row_count: usize,
    /// Lines seen in the chunk, kept or not
    line_count: usize,
    /// Errors carry chunk-local line numbers until merged
    errors: Vec<ParseError>,
}

/// Loads a CSV file into a [`Table`] using memory mapping
///
/// Column types come from `schema`; header columns it does not declare load
/// as strings. Fields that fail to parse become null and are reported in
/// the returned [`ParseSummary`], as are lines with the wrong field count
/// (which are dropped).
///
/// # Errors
/// Returns a [`ProcessorError`] if:
/// - File cannot be opened or mapped
/// - The header line is missing
/// - A declared column is absent from the header
///
/// # Example
/// ```rust,no_run
/// # use sales_store::processor::{loader::{load_csv, LoadOptions}, schema::Schema};
/// let (table, summary) =
///     load_csv("sales.csv".as_ref(), &Schema::sales_store(), &LoadOptions::default()).unwrap();
/// println!("{} rows, {} bad fields", table.row_count(), summary.errors.len());
/// ```
pub fn load_csv(
    path: &Path,
    schema: &Schema,
    options: &LoadOptions,
) -> Result<(Table, ParseSummary), ProcessorError> {
    let file = File::open(path)?;
    if file.metadata()?.len() == 0 {
        return Err(ProcessorError::Parse("Missing header line".into()));
    }
    let mmap = unsafe { Mmap::map(&file)? };
    let buf: &[u8] = &mmap[..];

    let (table, summary) = parse_buffer(buf, schema, options)?;
    info!(
        "loaded {} rows from {} ({} parse errors)",
        summary.rows_processed,
        path.display(),
        summary.errors.len()
    );
    Ok((table, summary))
}

/// Parses an in-memory CSV buffer. [`load_csv`] maps the file and calls this.
pub fn parse_buffer(
    buf: &[u8],
    schema: &Schema,
    options: &LoadOptions,
) -> Result<(Table, ParseSummary), ProcessorError> {
    // Parse header
    let header_end = buf.iter().position(|&b| b == b'\n').unwrap_or(buf.len());
    let header_line = trim_cr(&buf[..header_end]);
    if header_line.is_empty() {
        return Err(ProcessorError::Parse("Missing header line".into()));
    }

    let mut raw = Vec::new();
    split_fields(header_line, options.delimiter, &mut raw);
    let headers: Vec<String> = raw
        .iter()
        .map(|s| String::from_utf8_lossy(s).to_string())
        .collect();

    for field in schema.fields() {
        if !headers.contains(&field.name) {
            return Err(ProcessorError::MissingColumn(field.name.clone()));
        }
    }

    let col_types: Vec<ColumnType> = headers
        .iter()
        .map(|h| schema.type_of(h).unwrap_or(ColumnType::Str))
        .collect();

    let data_start = (header_end + 1).min(buf.len());
    let data = &buf[data_start..];

    // Find chunk boundaries (split by newlines)
    let num_threads = rayon::current_num_threads().max(1);
    let chunks = find_chunk_boundaries(data, num_threads);
    debug!("parsing {} bytes in {} chunks", data.len(), chunks.len());

    let batch_results: Vec<BatchResult> = chunks
        .par_iter()
        .enumerate()
        .map(|(chunk_idx, (start, end))| {
            debug!("chunk {chunk_idx}: bytes {start}..{end}");
            parse_chunk(&data[*start..*end], &col_types, &headers, options)
        })
        .collect();

    // Merge batch results in order
    let mut columns: Vec<Column> = col_types.iter().map(|t| Column::new(*t)).collect();
    let mut total_rows = 0;
    let mut lines_before = 0;
    let mut all_errors = Vec::new();

    for batch in batch_results {
        total_rows += batch.row_count;
        // +1 for the header, +1 to make it 1-based
        all_errors.extend(batch.errors.into_iter().map(|mut e| {
            e.row += lines_before + 2;
            e
        }));
        lines_before += batch.line_count;

        for (col, part) in columns.iter_mut().zip(batch.columns) {
            col.append(part)?;
        }
    }

    for e in &all_errors {
        match &e.error {
            Some(reason) if e.column.is_empty() => warn!("row {}: {reason}, line dropped", e.row),
            Some(reason) => warn!(
                "row {}: could not parse {:?} in column {:?}: {reason}",
                e.row, e.value, e.column
            ),
            None => warn!("row {}: could not parse {:?} in column {:?}", e.row, e.value, e.column),
        }
    }

    let table = Table::new(headers, columns)?;
    Ok((
        table,
        ParseSummary {
            rows_processed: total_rows,
            errors: all_errors,
        },
    ))
}

fn find_chunk_boundaries(data: &[u8], num_chunks: usize) -> Vec<(usize, usize)> {
    if data.is_empty() {
        return vec![];
    }

    let chunk_size = data.len() / num_chunks;
    let mut boundaries = Vec::with_capacity(num_chunks);
    let mut start = 0;

    for i in 0..num_chunks - 1 {
        let mut end = ((i + 1) * chunk_size).max(start);

        // Find next newline
        while end < data.len() && data[end] != b'\n' {
            end += 1;
        }

        if end < data.len() {
            end += 1; // Include the newline
        }

        if start < end {
            boundaries.push((start, end));
        }
        start = end;
    }

    // Last chunk gets everything remaining
    if start < data.len() {
        boundaries.push((start, data.len()));
    }

    boundaries
}

fn parse_chunk(
    chunk: &[u8],
    col_types: &[ColumnType],
    headers: &[String],
    options: &LoadOptions,
) -> BatchResult {
    let num_cols = col_types.len();
    let estimated_rows = memchr_iter(b'\n', chunk).count() + 1;

    let mut columns: Vec<Column> = col_types
        .iter()
        .map(|t| Column::with_capacity(*t, estimated_rows))
        .collect();
    let mut errors = Vec::new();
    let mut row_count = 0;
    let mut line_count = 0;
    let mut fields: Vec<Cow<'_, [u8]>> = Vec::with_capacity(num_cols);

    let mut start = 0;
    let ends = memchr_iter(b'\n', chunk).chain(
        // a final line without a newline
        (chunk.last() != Some(&b'\n')).then_some(chunk.len()),
    );

    for end in ends {
        let line = trim_cr(&chunk[start..end]);
        start = end + 1;
        let line_idx = line_count;
        line_count += 1;

        if line.is_empty() {
            continue;
        }

        split_fields(line, options.delimiter, &mut fields);
        if fields.len() != num_cols {
            errors.push(ParseError {
                row: line_idx,
                column: "".to_string(),
                value: String::from_utf8_lossy(line).to_string(),
                error: Some(format!("Expected {} fields, got {}", num_cols, fields.len())),
            });
            continue;
        }

        for col_idx in 0..num_cols {
            let raw = &fields[col_idx];
            if let Err(error) = push_field(&mut columns[col_idx], raw, options) {
                errors.push(ParseError {
                    row: line_idx,
                    column: headers[col_idx].clone(),
                    value: String::from_utf8_lossy(raw).to_string(),
                    error: Some(error),
                });
            }
        }

        row_count += 1;
    }

    BatchResult {
        columns,
        row_count,
        line_count,
        errors,
    }
}

/// Pushes one parsed field. On a coercion failure a null is pushed and the
/// reason is returned.
fn push_field(column: &mut Column, raw: &[u8], options: &LoadOptions) -> Result<(), String> {
    match column {
        Column::Str(values) => {
            values.push((!raw.is_empty()).then(|| String::from_utf8_lossy(raw).to_string()));
            Ok(())
        }
        Column::Int64(values) => {
            let field = raw.trim_ascii();
            if field.is_empty() {
                values.push(None);
                return Ok(());
            }
            match atoi_simd::parse::<i64>(field) {
                Ok(v) => {
                    values.push(Some(v));
                    Ok(())
                }
                Err(e) => {
                    values.push(None);
                    Err(e.to_string())
                }
            }
        }
        Column::Float64(values) => {
            let field = raw.trim_ascii();
            if field.is_empty() {
                values.push(None);
                return Ok(());
            }
            match fast_float::parse::<f64, _>(field) {
                Ok(v) => {
                    values.push(Some(v));
                    Ok(())
                }
                Err(e) => {
                    values.push(None);
                    Err(e.to_string())
                }
            }
        }
        Column::Date(values) => {
            let field = raw.trim_ascii();
            if field.is_empty() {
                values.push(None);
                return Ok(());
            }
            let parsed = str::from_utf8(field)
                .map_err(|e| e.to_string())
                .and_then(|s| {
                    NaiveDate::parse_from_str(s, &options.date_format).map_err(|e| e.to_string())
                });
            match parsed {
                Ok(d) => {
                    values.push(Some(d));
                    Ok(())
                }
                Err(e) => {
                    values.push(None);
                    Err(e)
                }
            }
        }
    }
}
