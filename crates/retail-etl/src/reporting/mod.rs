//! Output files of a run.
//!
//! The derived `orders.csv` and `order_items.csv` artifacts are written
//! before the load step; the quality report is written as text with a JSON
//! twin next to it. Every write replaces any file left by an earlier run.
//!
//! # Example
//!
//! ```rust,ignore
//! use retail_etl::reporting::ArtifactWriter;
//!
//! let writer = ArtifactWriter::new("output");
//! writer.write_orders(&batch.orders, "orders.csv")?;
//! writer.write_quality_report(&report, "data_quality_report.txt")?;
//! ```

mod writer;

pub use writer::ArtifactWriter;
