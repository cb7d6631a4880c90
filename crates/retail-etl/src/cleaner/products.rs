use super::{TrimText, drop_missing_key, keep_first_by_key};
use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::error::FieldError;
use crate::normalizers::{
    derive_surrogate_id, normalize_category, parse_amount, parse_count, trim_field, whole_number,
};
use crate::types::{Product, RawProduct, RawRecord};
use polars::prelude::{NamedFrom, Series};
use tracing::{debug, info};

const SOURCE: &str = RawProduct::SOURCE;

/// Parse a non-negative quantity, warning when a present value is rejected.
fn parse_non_negative<T: PartialOrd + Default>(
    id: &str,
    field: &'static str,
    raw: Option<&str>,
    parse: impl Fn(&'static str, &str) -> Result<T, FieldError>,
    sink: &dyn DiagnosticSink,
) -> Option<T> {
    let raw = raw?;
    match parse(field, raw) {
        Ok(value) if value >= T::default() => Some(value),
        Ok(_) => {
            sink.record(
                Diagnostic::warning(SOURCE, format!("{field}: negative value '{raw}' treated as missing"))
                    .with_row(id),
            );
            None
        }
        Err(e) => {
            sink.record(Diagnostic::warning(SOURCE, format!("{e}, treated as missing")).with_row(id));
            None
        }
    }
}

/// Clean raw product rows.
///
/// Missing prices and stock levels are filled with the median of the
/// present values in the same batch. Both medians are taken before any
/// fill. A row that needs a fill when no median exists is dropped.
pub fn clean_products(raw: &[RawProduct], sink: &dyn DiagnosticSink) -> Vec<Product> {
    let rows: Vec<(usize, RawProduct)> = raw
        .iter()
        .cloned()
        .map(|mut row| {
            row.product_id = derive_surrogate_id(row.product_id.as_deref());
            row.trim_text()
        })
        .enumerate()
        .collect();

    let rows = drop_missing_key(rows, SOURCE, "product_id", |r| r.product_id.as_deref(), sink);
    let rows = keep_first_by_key(rows, SOURCE, |r| r.product_id.as_deref(), sink);

    let parsed: Vec<(String, RawProduct, Option<f64>, Option<i64>)> = rows
        .into_iter()
        .filter_map(|(_, row)| {
            let id = row.product_id.clone()?;
            let price = parse_non_negative(&id, "price", row.price.as_deref(), parse_amount, sink);
            let stock = parse_non_negative(
                &id,
                "stock_quantity",
                row.stock_quantity.as_deref(),
                parse_count,
                sink,
            );
            Some((id, row, price, stock))
        })
        .collect();

    // Nulls are skipped by the median.
    let prices: Vec<Option<f64>> = parsed.iter().map(|(_, _, p, _)| *p).collect();
    let stock: Vec<Option<i64>> = parsed.iter().map(|(_, _, _, s)| *s).collect();
    let price_median = Series::new("price".into(), prices).median();
    let stock_median = Series::new("stock_quantity".into(), stock)
        .median()
        .and_then(|m| match whole_number("stock_quantity", m.round()) {
            Ok(value) => Some(value),
            Err(e) => {
                sink.record(Diagnostic::warning(SOURCE, format!("batch median unusable: {e}")));
                None
            }
        });
    debug!(
        "products: price median {:?}, stock median {:?}",
        price_median, stock_median
    );

    let mut products = Vec::with_capacity(parsed.len());
    for (product_id, row, price, stock) in parsed {
        let Some(price) = price.or_else(|| fill(&product_id, "price", price_median, sink)) else {
            continue;
        };
        let Some(stock_quantity) = stock.or_else(|| fill(&product_id, "stock_quantity", stock_median, sink)) else {
            continue;
        };

        products.push(Product {
            product_name: trim_field(row.product_name),
            category: trim_field(normalize_category(row.category.as_deref())),
            price,
            stock_quantity,
            product_id,
        });
    }

    info!("Cleaned products data: {} of {} rows kept", products.len(), raw.len());
    products
}

fn fill<T: Copy + std::fmt::Display>(
    id: &str,
    field: &str,
    median: Option<T>,
    sink: &dyn DiagnosticSink,
) -> Option<T> {
    match median {
        Some(value) => {
            sink.record(Diagnostic::info(SOURCE, format!("{field}: filled with batch median {value}")).with_row(id));
            Some(value)
        }
        None => {
            sink.record(
                Diagnostic::warning(
                    SOURCE,
                    format!("dropped row: {field} is missing and the batch has no value to fill from"),
                )
                .with_row(id),
            );
            None
        }
    }
}
