//! CSV dump and load of stored records

use std::collections::BTreeMap;
use std::io::{Read, Write};

use ::csv::{ReaderBuilder, StringRecord, WriterBuilder};
use miette::{IntoDiagnostic, Result};

use crate::builder::{FlatRecordBuilder, FlatRow};
use crate::schema::{flat_titles, flat_values, SchemaTree};
use crate::store::RecordStore;

/// Load statistics
#[derive(Debug, Default)]
pub struct LoadStats {
    pub rows_processed: usize,
    pub records_stored: usize,
    pub skipped: usize,
    /// Row number (1-indexed, header is row 1) and message of each rejected row
    pub errors: Vec<(usize, String)>,
}

/// Write every stored record as one CSV row under the schema's column titles
///
/// Returns the number of rows written.
pub fn dump<W: Write>(
    store: &RecordStore,
    schema: &SchemaTree,
    writer: W,
    title_sep: &str,
    value_sep: &str,
) -> Result<usize> {
    let titles = flat_titles(schema, title_sep);
    let mut wtr = WriterBuilder::new().from_writer(writer);
    wtr.write_record(&titles).into_diagnostic()?;

    let mut rows = 0;
    for stored in store.all()? {
        let cells: BTreeMap<String, String> = flat_values(&stored.record, title_sep, value_sep)
            .into_iter()
            .collect();
        let unknown: Vec<&String> = cells.keys().filter(|k| !titles.contains(k)).collect();
        if !unknown.is_empty() {
            tracing::warn!(id = stored.id, columns = ?unknown, "record has columns the schema lacks");
        }
        let row: Vec<&str> = titles
            .iter()
            .map(|t| cells.get(t).map(String::as_str).unwrap_or_default())
            .collect();
        wtr.write_record(&row).into_diagnostic()?;
        rows += 1;
    }

    wtr.flush().into_diagnostic()?;
    Ok(rows)
}

/// Build records from CSV rows and store them
///
/// Every row is built before anything is written, so a failing load leaves
/// the store untouched. Unless `append` is set, existing records are
/// removed first. With `skip_errors`, rows that fail to build are counted
/// and skipped instead of aborting the load.
pub fn load<R: Read>(
    store: &mut RecordStore,
    builder: &FlatRecordBuilder<'_>,
    reader: R,
    append: bool,
    skip_errors: bool,
) -> Result<LoadStats> {
    let mut stats = LoadStats::default();
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(::csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers().into_diagnostic()?.clone();
    let mut records = Vec::new();

    for (row_idx, result) in rdr.records().enumerate() {
        let row_num = row_idx + 2;
        stats.rows_processed += 1;

        let built = result
            .map_err(|e| format!("CSV parse error: {}", e))
            .and_then(|r| {
                builder
                    .build(&row_map(&headers, &r))
                    .map_err(|e| e.to_string())
            });

        match built {
            Ok(record) => records.push(record),
            Err(message) => {
                tracing::debug!(row = row_num, "{}", message);
                if !skip_errors {
                    return Err(miette::miette!("row {}: {}", row_num, message));
                }
                stats.errors.push((row_num, message));
                stats.skipped += 1;
            }
        }
    }

    stats.records_stored = store.insert_all(&records, !append)?;

    Ok(stats)
}

/// Map header names to non-empty cells
fn row_map(headers: &StringRecord, record: &StringRecord) -> FlatRow {
    headers
        .iter()
        .zip(record.iter())
        .filter(|(_, cell)| !cell.is_empty())
        .map(|(h, cell)| (h.to_string(), cell.to_string()))
        .collect()
}
