//! Raw source extraction.
//!
//! Sources are read with polars, every column as text. Typed conversion is
//! left to the cleaners. A source that cannot be read, or that lacks a
//! consumed column, degrades to an empty record set with an error
//! diagnostic so the rest of the run still proceeds.

use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::error::{EtlError, Result, ResultExt};
use crate::types::{RawCustomer, RawProduct, RawRecord, RawSale};
use polars::prelude::*;
use std::path::Path;
use tracing::{debug, info};

/// One extracted source: the raw frame (kept for the quality report) and
/// the typed records handed to its cleaner.
#[derive(Debug, Clone)]
pub struct SourceTable<T> {
    pub frame: DataFrame,
    pub records: Vec<T>,
}

impl<T> SourceTable<T> {
    pub fn empty() -> Self {
        Self {
            frame: DataFrame::empty(),
            records: Vec::new(),
        }
    }
}

/// The three raw sources of one run.
#[derive(Debug, Clone)]
pub struct RawSources {
    pub customers: SourceTable<RawCustomer>,
    pub products: SourceTable<RawProduct>,
    pub sales: SourceTable<RawSale>,
}

/// Read one source, degrading to an empty table on any table-level error.
pub fn extract_source<T: RawRecord>(path: &Path, sink: &dyn DiagnosticSink) -> SourceTable<T> {
    let frame = match read_csv_as_text(path) {
        Ok(frame) => frame,
        Err(e) => {
            sink.record(Diagnostic::error(T::SOURCE, e.to_string()));
            return SourceTable::empty();
        }
    };
    info!(
        "Loaded {} into DataFrame with shape {:?}",
        path.display(),
        frame.shape()
    );

    let records = validate_columns(&frame, T::SOURCE, T::COLUMNS)
        .and_then(|_| frame_to_records::<T>(&frame));
    match records {
        Ok(records) => SourceTable { frame, records },
        Err(e) => {
            sink.record(Diagnostic::error(T::SOURCE, e.to_string()));
            SourceTable {
                frame,
                records: Vec::new(),
            }
        }
    }
}

/// Read a CSV file with a header row, every column typed as text.
pub fn read_csv_as_text(path: &Path) -> Result<DataFrame> {
    if !path.is_file() {
        return Err(EtlError::SourceNotFound(path.display().to_string()));
    }

    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .and_then(|reader| reader.finish())
        .context(format!("Failed to read {}", path.display()))
}

/// Fail with [`EtlError::MissingColumns`] unless every consumed column exists.
pub fn validate_columns(df: &DataFrame, source: &str, required: &[&str]) -> Result<()> {
    let present: Vec<String> = df
        .get_column_names()
        .into_iter()
        .map(|name| name.trim().to_string())
        .collect();
    let missing: Vec<String> = required
        .iter()
        .filter(|col| !present.iter().any(|p| p == *col))
        .map(|col| col.to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(EtlError::MissingColumns {
            source_name: source.to_string(),
            columns: missing,
        })
    }
}

/// Convert a text frame into typed raw records, in row order.
pub fn frame_to_records<T: RawRecord>(df: &DataFrame) -> Result<Vec<T>> {
    let mut columns: Vec<Vec<Option<String>>> = Vec::with_capacity(T::COLUMNS.len());
    for name in T::COLUMNS {
        columns.push(text_column(df, name)?);
    }

    let records = (0..df.height())
        .map(|row| {
            let fields = columns.iter().map(|col| col[row].clone()).collect();
            T::from_fields(fields)
        })
        .collect::<Vec<_>>();

    debug!("Converted {} rows of {}", records.len(), T::SOURCE);
    Ok(records)
}

fn text_column(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    // Headers may carry stray whitespace in hand-edited exports.
    let actual = df
        .get_column_names()
        .into_iter()
        .find(|c| c.trim() == name)
        .map(|c| c.to_string())
        .unwrap_or_else(|| name.to_string());

    let series = df
        .column(&actual)?
        .as_materialized_series()
        .cast(&DataType::String)?;
    let values = series
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect();
    Ok(values)
}
