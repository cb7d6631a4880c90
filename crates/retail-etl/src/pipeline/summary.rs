use crate::diagnostics::DiagnosticCounts;
use crate::loader::LoadSummary;
use crate::quality::QualityReport;
use serde::Serialize;

/// Row counts per entity at one point of the run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EntityCounts {
    pub customers: usize,
    pub products: usize,
    pub sales: usize,
}

/// Everything a caller needs to know about one finished run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Local timestamp when the run finished
    pub generated_at: String,
    /// Total execution time in milliseconds
    pub duration_ms: u64,
    /// Store the run loaded into
    pub database: String,
    /// Records read from each raw source
    pub raw: EntityCounts,
    /// Records kept by each cleaner
    pub cleaned: EntityCounts,
    pub orders: usize,
    pub order_items: usize,
    /// Paths of the derived CSV artifacts actually written
    pub artifacts: Vec<String>,
    /// Paths of the quality report files
    pub report_files: Vec<String>,
    pub load: LoadSummary,
    pub quality: QualityReport,
    pub diagnostics: DiagnosticCounts,
}

impl RunSummary {
    /// True when every table that had rows was loaded.
    pub fn is_success(&self) -> bool {
        !self.load.has_failures()
    }
}
