//! Error types for the retail ETL pipeline.
//!
//! Three layers of errors exist, mirroring how far a failure is allowed to
//! travel:
//!
//! - [`FieldError`] never leaves a cleaner. Normalizers return it, the cleaner
//!   records a diagnostic and degrades the field to absent.
//! - [`StoreError`] is produced by a relational store and classified by the
//!   load orchestrator into fatal (connectivity) and table-local failures.
//! - [`EtlError`] is the crate-level error for extraction, reporting and
//!   configuration. It is serializable so a run summary can carry it.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for the ETL pipeline.
#[derive(Error, Debug)]
pub enum EtlError {
    /// A raw source lacks columns the cleaners depend on.
    #[error("Source '{source_name}' is missing required columns: {columns:?}")]
    MissingColumns {
        source_name: String,
        columns: Vec<String>,
    },

    /// A raw source file could not be found.
    #[error("Source file not found: {0}")]
    SourceNotFound(String),

    /// A derived artifact could not be written.
    #[error("Failed to write artifact '{artifact}': {reason}")]
    ArtifactWriteFailed { artifact: String, reason: String },

    /// Report generation failed.
    #[error("Failed to generate report: {0}")]
    ReportGenerationFailed(String),

    /// Store failure surfaced outside the orchestrator (e.g. opening a store).
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<EtlError>,
    },
}

impl EtlError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        EtlError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Stable error code, used in JSON summaries.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::MissingColumns { .. } => "MISSING_COLUMNS",
            Self::SourceNotFound(_) => "SOURCE_NOT_FOUND",
            Self::ArtifactWriteFailed { .. } => "ARTIFACT_WRITE_FAILED",
            Self::ReportGenerationFailed(_) => "REPORT_GENERATION_FAILED",
            Self::Store(e) => e.error_code(),
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }
}

/// Serialized as `{code, message}`, the same shape used for every error
/// that ends up in a run summary.
impl Serialize for EtlError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("EtlError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for ETL operations.
pub type Result<T> = std::result::Result<T, EtlError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| EtlError::Polars(e).with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| EtlError::Io(e).with_context(context))
    }
}

/// Why a single field could not be normalized.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    #[error("value is missing")]
    Missing,

    #[error("could not parse phone number '{0}'")]
    UnparseablePhone(String),

    #[error("phone number '{0}' is not valid for its region")]
    InvalidPhone(String),

    #[error("could not parse date '{0}'")]
    UnparseableDate(String),

    #[error("'{value}' is not a valid {field}")]
    InvalidNumber { field: &'static str, value: String },
}

/// Failure reported by a relational store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The store cannot be reached or the session broke. Fatal for a run.
    #[error("connection failed: {0}")]
    Connection(String),

    /// A key, uniqueness or not-null constraint rejected the change.
    #[error("constraint violated on '{table}': {message}")]
    Constraint { table: String, message: String },

    /// The store rejected a value or statement.
    #[error("data error on '{table}': {message}")]
    Data { table: String, message: String },

    /// Schema bootstrap failed.
    #[error("schema error: {0}")]
    Schema(String),
}

impl StoreError {
    /// Connectivity failures stop every load that has not started yet.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Connection(_))
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Connection(_) => "STORE_CONNECTION",
            Self::Constraint { .. } => "STORE_CONSTRAINT",
            Self::Data { .. } => "STORE_DATA",
            Self::Schema(_) => "STORE_SCHEMA",
        }
    }
}

impl Serialize for StoreError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("StoreError", 3)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.serialize_field("fatal", &self.is_fatal())?;
        state.end()
    }
}

/// Result type alias for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;
