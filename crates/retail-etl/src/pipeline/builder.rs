//! Main ETL pipeline module.
//!
//! This module provides the core `Pipeline` struct and builder for
//! orchestrating one full-refresh run.

use crate::cleaner::EntityCleaner;
use crate::config::{ConfigValidationError, EtlConfig};
use crate::decompose::{split_to_order_items, split_to_orders};
use crate::diagnostics::{CountingSink, Diagnostic, DiagnosticSink, TracingSink};
use crate::error::Result;
use crate::extract::{RawSources, extract_source};
use crate::loader::{LOAD_SEQUENCE, LoadOrchestrator, LoadSummary};
use crate::pipeline::progress::{
    ClosureProgressReporter, PipelineStage, ProgressReporter, ProgressUpdate,
};
use crate::pipeline::summary::{EntityCounts, RunSummary};
use crate::quality::{QualityReport, QualityReporter};
use crate::reporting::ArtifactWriter;
use crate::store::{RelationalStore, SqliteStore};
use crate::types::CleanBatch;
use chrono::Local;
use phonenumber::country;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// The ETL pipeline.
///
/// Use [`Pipeline::builder()`] to create a new pipeline with custom configuration.
///
/// # Example
///
/// ```rust,ignore
/// use retail_etl::{EtlConfig, MemoryStore, Pipeline};
/// use std::sync::Arc;
///
/// // Into the SQLite database named by the config
/// let summary = Pipeline::builder()
///     .config(EtlConfig::builder().data_dir("data").build()?)
///     .on_progress(|update| {
///         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
///     })
///     .build()?
///     .run()?;
///
/// // Into an in-memory store
/// let summary = Pipeline::builder()
///     .store(Arc::new(MemoryStore::new()))
///     .build()?
///     .run()?;
/// ```
pub struct Pipeline {
    config: EtlConfig,
    region: country::Id,
    store: Arc<dyn RelationalStore>,
    diagnostics: Arc<dyn DiagnosticSink>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
    writer: ArtifactWriter,
}

static_assertions::assert_impl_all!(Pipeline: Send, Sync);

impl Pipeline {
    /// Create a new pipeline builder.
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    pub fn config(&self) -> &EtlConfig {
        &self.config
    }

    /// Run extract, transform, export, load and report once.
    ///
    /// Table-level problems (a missing source, a failed table load) do not
    /// make this fail; they show up in the summary and the diagnostics.
    /// An error is returned only when the quality report cannot be produced.
    pub fn run(&self) -> Result<RunSummary> {
        match self.run_internal() {
            Ok(summary) => {
                self.report_progress(ProgressUpdate::complete(if summary.is_success() {
                    "Run completed successfully"
                } else {
                    "Run completed with load failures"
                }));
                Ok(summary)
            }
            Err(e) => {
                self.report_progress(ProgressUpdate::failed(e.to_string()));
                error!("Pipeline error: {}", e);
                Err(e)
            }
        }
    }

    /// Read the three raw sources.
    pub fn extract(&self, sink: &dyn DiagnosticSink) -> RawSources {
        self.report_extracting("customers", 0);
        let customers = extract_source(&self.config.customers_path(), sink);
        self.report_extracting("products", 1);
        let products = extract_source(&self.config.products_path(), sink);
        self.report_extracting("sales", 2);
        let sales = extract_source(&self.config.sales_path(), sink);

        RawSources {
            customers,
            products,
            sales,
        }
    }

    /// Clean every source and decompose the sales.
    ///
    /// Pure with respect to the store and the file system: the same sources
    /// always produce the same batch.
    pub fn transform(&self, sources: &RawSources, sink: &dyn DiagnosticSink) -> CleanBatch {
        let cleaner = EntityCleaner::new(self.region, sink);

        self.report_progress(ProgressUpdate::with_items(
            PipelineStage::Cleaning,
            "customers",
            0,
            3,
            "Cleaning customers",
        ));
        let customers = cleaner.customers(&sources.customers.records);

        self.report_progress(ProgressUpdate::with_items(
            PipelineStage::Cleaning,
            "products",
            1,
            3,
            "Cleaning products",
        ));
        let products = cleaner.products(&sources.products.records);

        self.report_progress(ProgressUpdate::with_items(
            PipelineStage::Cleaning,
            "sales",
            2,
            3,
            "Cleaning sales",
        ));
        let sales = cleaner.sales(&sources.sales.records);

        self.report_progress(ProgressUpdate::new(
            PipelineStage::Decomposing,
            0.0,
            "Splitting sales into orders and order items",
        ));
        let orders = split_to_orders(&sales);
        let order_items = split_to_order_items(&sales);

        CleanBatch {
            customers,
            products,
            sales,
            orders,
            order_items,
        }
    }

    fn report_extracting(&self, source: &str, index: usize) {
        self.report_progress(ProgressUpdate::with_items(
            PipelineStage::Extracting,
            source,
            index,
            3,
            format!("Reading {source}"),
        ));
    }

    /// Report progress if a reporter is configured.
    fn report_progress(&self, update: ProgressUpdate) {
        if let Some(reporter) = &self.progress_reporter {
            reporter.report(update);
        }
    }

    fn run_internal(&self) -> Result<RunSummary> {
        let start_time = Instant::now();
        let sink = CountingSink::new(self.diagnostics.clone());

        info!("Starting ETL run into {}", self.store.describe());

        // Step 1: Extract
        let sources = self.extract(&sink);
        let raw = EntityCounts {
            customers: sources.customers.frame.height(),
            products: sources.products.frame.height(),
            sales: sources.sales.frame.height(),
        };

        // Step 2: Transform
        let batch = self.transform(&sources, &sink);
        let cleaned = EntityCounts {
            customers: batch.customers.len(),
            products: batch.products.len(),
            sales: batch.sales.len(),
        };
        info!(
            "Transformed: {} customers, {} products, {} sales, {} orders, {} order items",
            cleaned.customers,
            cleaned.products,
            cleaned.sales,
            batch.orders.len(),
            batch.order_items.len()
        );

        // Step 3: Derived artifacts, before the load
        let artifacts = if self.config.write_artifacts {
            self.report_progress(ProgressUpdate::new(
                PipelineStage::Exporting,
                0.0,
                "Writing derived artifacts",
            ));
            self.write_artifacts(&batch, &sink)
        } else {
            info!("Skipping derived artifacts (disabled)");
            Vec::new()
        };

        // Step 4: Load
        self.report_progress(ProgressUpdate::new(
            PipelineStage::Loading,
            0.0,
            "Loading tables",
        ));
        let load = if self.config.dry_run {
            info!("Dry run: {} left untouched", self.store.describe());
            LoadSummary::skipped("dry run")
        } else {
            let orchestrator = LoadOrchestrator::new(self.store.as_ref(), &sink)
                .with_retry(self.config.connect_attempts, self.config.connect_backoff());
            orchestrator.load_with_progress(&batch, |index, table_load| {
                self.report_progress(ProgressUpdate::with_items(
                    PipelineStage::Loading,
                    table_load.table.name(),
                    index + 1,
                    LOAD_SEQUENCE.len(),
                    format!("Table {} processed", table_load.table),
                ));
            })
        };

        // Step 5: Quality report over the raw frames
        self.report_progress(ProgressUpdate::new(
            PipelineStage::Reporting,
            0.0,
            "Writing data quality report",
        ));
        let quality = self.quality_report(&sources, cleaned)?;
        let (text_path, json_path) = self
            .writer
            .write_quality_report(&quality, &self.config.report_file)?;

        let summary = RunSummary {
            generated_at: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            duration_ms: start_time.elapsed().as_millis() as u64,
            database: self.store.describe(),
            raw,
            cleaned,
            orders: batch.orders.len(),
            order_items: batch.order_items.len(),
            artifacts,
            report_files: vec![
                text_path.display().to_string(),
                json_path.display().to_string(),
            ],
            load,
            quality,
            diagnostics: sink.counts(),
        };

        info!(
            "ETL run finished in {} ms ({} warnings, {} errors)",
            summary.duration_ms, summary.diagnostics.warnings, summary.diagnostics.errors
        );
        Ok(summary)
    }

    /// Artifact failures are reported and the load still runs.
    fn write_artifacts(&self, batch: &CleanBatch, sink: &dyn DiagnosticSink) -> Vec<String> {
        let results = [
            (
                self.config.orders_file.as_str(),
                self.writer.write_orders(&batch.orders, &self.config.orders_file),
            ),
            (
                self.config.order_items_file.as_str(),
                self.writer
                    .write_order_items(&batch.order_items, &self.config.order_items_file),
            ),
        ];

        let mut written = Vec::new();
        for (name, result) in results {
            match result {
                Ok(path) => written.push(path.display().to_string()),
                Err(e) => sink.record(Diagnostic::error(name, e.to_string())),
            }
        }
        written
    }

    fn quality_report(&self, sources: &RawSources, cleaned: EntityCounts) -> Result<QualityReport> {
        let mut reporter = QualityReporter::new();
        reporter.add_source(
            &self.config.customers_file,
            &sources.customers.frame,
            cleaned.customers,
        )?;
        reporter.add_source(
            &self.config.products_file,
            &sources.products.frame,
            cleaned.products,
        )?;
        reporter.add_source(&self.config.sales_file, &sources.sales.frame, cleaned.sales)?;
        Ok(reporter.finish())
    }
}

/// Builder for [`Pipeline`].
#[derive(Default)]
pub struct PipelineBuilder {
    config: Option<EtlConfig>,
    store: Option<Arc<dyn RelationalStore>>,
    diagnostics: Option<Arc<dyn DiagnosticSink>>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
}

static_assertions::assert_impl_all!(PipelineBuilder: Send);

impl PipelineBuilder {
    /// Set the run configuration.
    pub fn config(mut self, config: EtlConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the relational store to load into.
    ///
    /// Defaults to a [`SqliteStore`] at the configured database path.
    pub fn store(mut self, store: Arc<dyn RelationalStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the sink receiving the run's diagnostics.
    ///
    /// Defaults to [`TracingSink`], which forwards every diagnostic to the
    /// `tracing` subscriber.
    pub fn diagnostics(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.diagnostics = Some(sink);
        self
    }

    /// Set a progress reporter for receiving updates during the run.
    pub fn progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress_reporter = Some(reporter);
        self
    }

    /// Set a progress callback closure.
    ///
    /// This is a convenience method for simple progress handling.
    /// For more complex scenarios, use [`progress_reporter`](Self::progress_reporter).
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_reporter = Some(Arc::new(ClosureProgressReporter::new(callback)));
        self
    }

    /// Build the pipeline.
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> std::result::Result<Pipeline, ConfigValidationError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;
        let region = config.region()?;

        let store = self
            .store
            .unwrap_or_else(|| Arc::new(SqliteStore::new(config.database_path.clone())));
        let writer = ArtifactWriter::new(config.output_dir.clone());

        Ok(Pipeline {
            region,
            store,
            diagnostics: self.diagnostics.unwrap_or_else(|| Arc::new(TracingSink)),
            progress_reporter: self.progress_reporter,
            writer,
            config,
        })
    }
}
