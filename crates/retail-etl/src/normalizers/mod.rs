//! Field normalizers.
//!
//! The submodules hold pure parsing functions returning
//! [`FieldError`](crate::error::FieldError). [`FieldNormalizer`] wraps them
//! for the cleaners: it turns an error into `None` plus one warning on the
//! run's diagnostic sink.

pub mod date;
pub mod number;
pub mod phone;
pub mod text;

pub use date::parse_date;
pub use number::{parse_amount, parse_count, whole_number};
pub use phone::parse_phone;
pub use text::{derive_surrogate_id, normalize_category, trim_field};

use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::error::FieldError;
use phonenumber::country;

/// Normalizer bound to one source and one diagnostic sink.
pub struct FieldNormalizer<'a> {
    source: &'static str,
    region: country::Id,
    sink: &'a dyn DiagnosticSink,
}

impl<'a> FieldNormalizer<'a> {
    pub fn new(source: &'static str, region: country::Id, sink: &'a dyn DiagnosticSink) -> Self {
        Self {
            source,
            region,
            sink,
        }
    }

    /// Canonical phone number, or `None` with one warning.
    pub fn normalize_phone(&self, row: &str, raw: Option<&str>) -> Option<String> {
        let result = match raw {
            Some(value) => parse_phone(value, self.region),
            None => Err(FieldError::Missing),
        };
        self.keep_or_warn(row, "phone", result)
    }

    /// ISO date, or `None` with one warning.
    pub fn normalize_date(&self, row: &str, field: &'static str, raw: Option<&str>) -> Option<String> {
        let result = match raw {
            Some(value) => parse_date(value),
            None => Err(FieldError::Missing),
        };
        self.keep_or_warn(row, field, result)
    }

    pub fn warn(&self, row: &str, message: impl Into<String>) {
        self.sink
            .record(Diagnostic::warning(self.source, message).with_row(row));
    }

    fn keep_or_warn(
        &self,
        row: &str,
        field: &str,
        result: Result<String, FieldError>,
    ) -> Option<String> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                self.warn(row, format!("{field}: {e}"));
                None
            }
        }
    }
}
