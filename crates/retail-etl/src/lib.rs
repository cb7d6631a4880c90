//! Retail ETL Library
//!
//! A batch ETL for retail records built with Rust, Polars and SQLite.
//!
//! # Overview
//!
//! One run takes three raw CSV exports (customers, products, point-of-sale
//! transactions) through these stages:
//!
//! - **Extraction**: every column read as text, required columns validated
//! - **Cleaning**: surrogate keys, trimming, deduplication, phone and date
//!   normalization, category vocabulary, median fill of prices and stock
//! - **Decomposition**: each sale becomes one order with one order item
//! - **Export**: `orders.csv` and `order_items.csv` written before the load
//! - **Loading**: four tables refreshed in dependency order, one transaction
//!   per table, connectivity failures stopping the rest
//! - **Quality Report**: per-source counts of rows, duplicates and nulls
//!
//! Problems with single fields or rows never stop a run. They degrade the
//! value or drop the row and are reported through a [`DiagnosticSink`].
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use retail_etl::{EtlConfig, Pipeline};
//!
//! let config = EtlConfig::builder()
//!     .data_dir("data")
//!     .output_dir("output")
//!     .phone_region("IN")
//!     .build()?;
//!
//! let summary = Pipeline::builder()
//!     .config(config)
//!     .on_progress(|update| {
//!         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
//!     })
//!     .build()?
//!     .run()?;
//!
//! println!("Loaded {} tables", summary.load.loaded_count());
//! ```
//!
//! # Stores
//!
//! Loading goes through the [`RelationalStore`] trait:
//!
//! - [`SqliteStore`] - a SQLite database file with foreign keys enforced
//! - [`MemoryStore`] - an in-memory store with the same constraints and an
//!   operation journal, used by tests

pub mod cleaner;
pub mod config;
pub mod decompose;
pub mod diagnostics;
pub mod error;
pub mod extract;
pub mod loader;
pub mod normalizers;
pub mod pipeline;
pub mod quality;
pub mod reporting;
pub mod store;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use cleaner::{EntityCleaner, clean_customers, clean_products, clean_sales};
pub use config::{ConfigValidationError, EtlConfig, EtlConfigBuilder};
pub use decompose::{split_to_order_items, split_to_orders};
pub use diagnostics::{
    ClosureSink, CollectingSink, CountingSink, Diagnostic, DiagnosticCounts, DiagnosticSink,
    Severity, TracingSink,
};
pub use error::{EtlError, FieldError, Result as EtlResult, ResultExt, StoreError, StoreResult};
pub use extract::{RawSources, SourceTable};
pub use loader::{LOAD_SEQUENCE, LoadOrchestrator, LoadStep, LoadSummary, TableLoad, TableOutcome};
pub use normalizers::{FieldNormalizer, derive_surrogate_id, normalize_category, parse_date, parse_phone};
pub use pipeline::{
    ClosureProgressReporter, EntityCounts, Pipeline, PipelineBuilder, PipelineStage,
    ProgressReporter, ProgressUpdate, RunSummary,
};
pub use quality::{QualityReport, QualityReporter, SourceQuality};
pub use reporting::ArtifactWriter;
pub use store::{MemoryStore, RelationalStore, SqliteStore, StoreOp, StoreSession, Table};
pub use types::{
    CleanBatch, Customer, Order, OrderItem, Product, RawCustomer, RawProduct, RawRecord, RawSale,
    Sale,
};
