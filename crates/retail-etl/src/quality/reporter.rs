use crate::error::{Result, ResultExt};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use tracing::info;

/// Metrics for one raw source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceQuality {
    /// File name of the raw source, e.g. `customers_raw.csv`.
    pub file: String,
    /// Rows read from the source.
    pub records_processed: usize,
    /// Rows that exactly repeat an earlier row.
    pub duplicates_removed: usize,
    /// Null cells across all columns.
    pub missing_values: usize,
    /// Rows that survived cleaning.
    pub records_loaded: usize,
}

/// Quality report over all raw sources of one run, in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityReport {
    pub sources: Vec<SourceQuality>,
}

impl QualityReport {
    pub fn source(&self, file: &str) -> Option<&SourceQuality> {
        self.sources.iter().find(|s| s.file == file)
    }

    /// Plain-text rendering written to `data_quality_report.txt`.
    pub fn render_text(&self) -> String {
        let mut out = String::from("Data Quality Report (ETL Summary):\n\n");
        for s in &self.sources {
            // Writing into a String cannot fail.
            let _ = write!(
                out,
                "File: {}\n- Records Processed: {}\n- Duplicates Removed: {}\n- Missing Values Handled: {}\n- Records Loaded Successfully: {}\n\n",
                s.file, s.records_processed, s.duplicates_removed, s.missing_values, s.records_loaded
            );
        }
        out
    }
}

/// Builds [`QualityReport`]s from raw frames.
pub struct QualityReporter {
    sources: Vec<SourceQuality>,
}

impl QualityReporter {
    pub fn new() -> Self {
        Self { sources: Vec::new() }
    }

    /// Measure one raw frame and record it under `file`.
    pub fn add_source(&mut self, file: &str, raw: &DataFrame, records_loaded: usize) -> Result<&SourceQuality> {
        let quality = Self::measure(file, raw, records_loaded)?;
        info!(
            "Quality for {}: {} processed, {} duplicates, {} missing, {} loaded",
            quality.file,
            quality.records_processed,
            quality.duplicates_removed,
            quality.missing_values,
            quality.records_loaded
        );
        self.sources.push(quality);
        Ok(&self.sources[self.sources.len() - 1])
    }

    pub fn finish(self) -> QualityReport {
        QualityReport { sources: self.sources }
    }

    /// Metrics for a single frame.
    pub fn measure(file: &str, raw: &DataFrame, records_loaded: usize) -> Result<SourceQuality> {
        let records_processed = raw.height();

        let duplicates_removed = if raw.width() == 0 || records_processed == 0 {
            0
        } else {
            let unique = raw
                .unique::<&str, &str>(None, UniqueKeepStrategy::First, None)
                .context(format!("Failed to count duplicates in {file}"))?;
            records_processed - unique.height()
        };

        let missing_values = raw.get_columns().iter().map(|c| c.null_count()).sum();

        Ok(SourceQuality {
            file: file.to_string(),
            records_processed,
            duplicates_removed,
            missing_values,
            records_loaded,
        })
    }
}

impl Default for QualityReporter {
    fn default() -> Self {
        Self::new()
    }
}
