//! Entity cleaners.
//!
//! Each cleaner is a total function from raw records to clean entities:
//! - Derives surrogate keys from the external prefixed ids
//! - Trims every text field (blank becomes absent)
//! - Drops rows without a usable key and collapses duplicate keys
//! - Normalizes phones, dates, categories and numbers
//!
//! Nothing here returns an error. Field problems degrade the field to
//! absent, row problems drop the row, and both leave a diagnostic.

mod customers;
mod products;
mod sales;

pub use customers::clean_customers;
pub use products::clean_products;
pub use sales::clean_sales;

use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::normalizers::trim_field;
use crate::types::{Customer, Product, RawCustomer, RawProduct, RawSale, Sale};
use phonenumber::country;
use std::collections::HashSet;
use tracing::debug;

/// Trims every text field of a raw row. Idempotent.
pub trait TrimText {
    fn trim_text(self) -> Self;
}

impl TrimText for RawCustomer {
    fn trim_text(self) -> Self {
        Self {
            customer_id: trim_field(self.customer_id),
            first_name: trim_field(self.first_name),
            last_name: trim_field(self.last_name),
            email: trim_field(self.email),
            phone: trim_field(self.phone),
            city: trim_field(self.city),
            registration_date: trim_field(self.registration_date),
        }
    }
}

impl TrimText for RawProduct {
    fn trim_text(self) -> Self {
        Self {
            product_id: trim_field(self.product_id),
            product_name: trim_field(self.product_name),
            category: trim_field(self.category),
            price: trim_field(self.price),
            stock_quantity: trim_field(self.stock_quantity),
        }
    }
}

impl TrimText for RawSale {
    fn trim_text(self) -> Self {
        Self {
            transaction_id: trim_field(self.transaction_id),
            customer_id: trim_field(self.customer_id),
            product_id: trim_field(self.product_id),
            quantity: trim_field(self.quantity),
            unit_price: trim_field(self.unit_price),
            transaction_date: trim_field(self.transaction_date),
            status: trim_field(self.status),
        }
    }
}

/// Runs the three cleaners with one phone region and one diagnostic sink.
pub struct EntityCleaner<'a> {
    region: country::Id,
    sink: &'a dyn DiagnosticSink,
}

impl<'a> EntityCleaner<'a> {
    pub fn new(region: country::Id, sink: &'a dyn DiagnosticSink) -> Self {
        Self { region, sink }
    }

    pub fn customers(&self, raw: &[RawCustomer]) -> Vec<Customer> {
        clean_customers(raw, self.region, self.sink)
    }

    pub fn products(&self, raw: &[RawProduct]) -> Vec<Product> {
        clean_products(raw, self.sink)
    }

    pub fn sales(&self, raw: &[RawSale]) -> Vec<Sale> {
        clean_sales(raw, self.sink)
    }
}

/// Row label for diagnostics: the key when present, else the 1-based
/// position in the source.
pub(crate) fn row_label(key: Option<&str>, index: usize) -> String {
    match key {
        Some(key) => key.to_string(),
        None => format!("#{}", index + 1),
    }
}

/// Keep rows whose key is present, warning about the others.
pub(crate) fn drop_missing_key<T>(
    rows: Vec<(usize, T)>,
    source: &'static str,
    field: &str,
    key: impl Fn(&T) -> Option<&str>,
    sink: &dyn DiagnosticSink,
) -> Vec<(usize, T)> {
    let before = rows.len();
    let kept: Vec<(usize, T)> = rows
        .into_iter()
        .filter(|(index, row)| {
            if key(row).is_some() {
                true
            } else {
                sink.record(
                    Diagnostic::warning(source, format!("dropped row: {field} is missing"))
                        .with_row(row_label(None, *index)),
                );
                false
            }
        })
        .collect();
    debug!(
        "{}: dropped {} rows with missing {}",
        source,
        before - kept.len(),
        field
    );
    kept
}

/// Collapse rows sharing a key, keeping the first occurrence in source order.
///
/// Rows without a key pass through untouched.
pub(crate) fn keep_first_by_key<T>(
    rows: Vec<(usize, T)>,
    source: &'static str,
    key: impl Fn(&T) -> Option<&str>,
    sink: &dyn DiagnosticSink,
) -> Vec<(usize, T)> {
    let mut seen: HashSet<String> = HashSet::new();
    let before = rows.len();
    let kept: Vec<(usize, T)> = rows
        .into_iter()
        .filter(|(_, row)| match key(row) {
            Some(k) if !seen.insert(k.to_string()) => {
                sink.record(
                    Diagnostic::warning(source, "dropped duplicate row, first occurrence kept")
                        .with_row(k),
                );
                false
            }
            _ => true,
        })
        .collect();
    debug!("{}: removed {} duplicate rows", source, before - kept.len());
    kept
}
