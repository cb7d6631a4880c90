//! Run-scoped diagnostics.
//!
//! Cleaners, the loader and the extractor never log directly. They push
//! [`Diagnostic`] records into a [`DiagnosticSink`] handed to them by the
//! pipeline, so one run's warnings can be counted, collected in tests, or
//! forwarded to `tracing` without any global state.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{error, info, warn};

/// How serious a diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// One observation made while processing a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Source or table the observation concerns (e.g. "customers").
    pub source: String,
    /// Row identifier, when the observation concerns one row.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row: Option<String>,
    pub message: String,
}

impl Diagnostic {
    pub fn new(severity: Severity, source: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity,
            source: source.into(),
            row: None,
            message: message.into(),
        }
    }

    pub fn info(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Info, source, message)
    }

    pub fn warning(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, source, message)
    }

    pub fn error(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, source, message)
    }

    /// Attach the row identifier the diagnostic refers to.
    pub fn with_row(mut self, row: impl Into<String>) -> Self {
        self.row = Some(row.into());
        self
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.row {
            Some(row) => write!(f, "[{}] row {}: {}", self.source, row, self.message),
            None => write!(f, "[{}] {}", self.source, self.message),
        }
    }
}

/// Receiver for diagnostics produced during a run.
pub trait DiagnosticSink: Send + Sync {
    fn record(&self, diagnostic: Diagnostic);
}

/// Forwards diagnostics to `tracing` at the matching level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn record(&self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::Info => info!("{}", diagnostic),
            Severity::Warning => warn!("{}", diagnostic),
            Severity::Error => error!("{}", diagnostic),
        }
    }
}

/// Keeps every diagnostic in memory.
#[derive(Debug, Default)]
pub struct CollectingSink {
    records: Mutex<Vec<Diagnostic>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far, in arrival order.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.records.lock().clone()
    }

    pub fn warnings(&self) -> Vec<Diagnostic> {
        self.records
            .lock()
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .cloned()
            .collect()
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.records
            .lock()
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    pub fn clear(&self) {
        self.records.lock().clear();
    }
}

impl DiagnosticSink for CollectingSink {
    fn record(&self, diagnostic: Diagnostic) {
        self.records.lock().push(diagnostic);
    }
}

/// Wrapper that implements [`DiagnosticSink`] using a closure.
pub struct ClosureSink<F>
where
    F: Fn(Diagnostic) + Send + Sync,
{
    callback: F,
}

impl<F> ClosureSink<F>
where
    F: Fn(Diagnostic) + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> DiagnosticSink for ClosureSink<F>
where
    F: Fn(Diagnostic) + Send + Sync,
{
    fn record(&self, diagnostic: Diagnostic) {
        (self.callback)(diagnostic);
    }
}

/// Diagnostic totals for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticCounts {
    pub info: usize,
    pub warnings: usize,
    pub errors: usize,
}

impl DiagnosticCounts {
    pub fn total(&self) -> usize {
        self.info + self.warnings + self.errors
    }
}

/// Counts diagnostics per severity, then passes them on to an inner sink.
pub struct CountingSink {
    inner: Arc<dyn DiagnosticSink>,
    info: AtomicUsize,
    warnings: AtomicUsize,
    errors: AtomicUsize,
}

impl CountingSink {
    pub fn new(inner: Arc<dyn DiagnosticSink>) -> Self {
        Self {
            inner,
            info: AtomicUsize::new(0),
            warnings: AtomicUsize::new(0),
            errors: AtomicUsize::new(0),
        }
    }

    pub fn counts(&self) -> DiagnosticCounts {
        DiagnosticCounts {
            info: self.info.load(Ordering::Relaxed),
            warnings: self.warnings.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

impl DiagnosticSink for CountingSink {
    fn record(&self, diagnostic: Diagnostic) {
        let counter = match diagnostic.severity {
            Severity::Info => &self.info,
            Severity::Warning => &self.warnings,
            Severity::Error => &self.errors,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        self.inner.record(diagnostic);
    }
}

static_assertions::assert_impl_all!(CollectingSink: Send, Sync);
static_assertions::assert_impl_all!(CountingSink: Send, Sync);
