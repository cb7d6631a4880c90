//! Data quality reporting.
//!
//! Metrics are computed on the raw source frames, before any cleaning,
//! and paired with the number of rows each cleaner kept. The reporter is
//! read-only: it never changes the frames it inspects.

mod reporter;

pub use reporter::{QualityReport, QualityReporter, SourceQuality};
