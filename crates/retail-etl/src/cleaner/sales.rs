use super::{TrimText, drop_missing_key, keep_first_by_key};
use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::error::FieldError;
use crate::normalizers::{derive_surrogate_id, parse_amount, parse_count, parse_date};
use crate::types::{RawRecord, RawSale, Sale};
use tracing::info;

const SOURCE: &str = RawSale::SOURCE;

/// Clean raw sale rows.
///
/// Cleaned sales keep the order of first appearance in the raw input;
/// order item ordinals are derived from that order.
pub fn clean_sales(raw: &[RawSale], sink: &dyn DiagnosticSink) -> Vec<Sale> {
    let rows: Vec<(usize, RawSale)> = raw
        .iter()
        .cloned()
        .map(|mut row| {
            row.transaction_id = derive_surrogate_id(row.transaction_id.as_deref());
            row.customer_id = derive_surrogate_id(row.customer_id.as_deref());
            row.product_id = derive_surrogate_id(row.product_id.as_deref());
            row.trim_text()
        })
        .enumerate()
        .collect();

    let rows = drop_missing_key(rows, SOURCE, "transaction_id", |r| r.transaction_id.as_deref(), sink);
    let rows = keep_first_by_key(rows, SOURCE, |r| r.transaction_id.as_deref(), sink);
    let rows = drop_missing_key(rows, SOURCE, "customer_id", |r| r.customer_id.as_deref(), sink);
    let rows = drop_missing_key(rows, SOURCE, "product_id", |r| r.product_id.as_deref(), sink);

    let mut sales = Vec::with_capacity(rows.len());
    for (_, row) in rows {
        let (Some(transaction_id), Some(customer_id), Some(product_id)) =
            (row.transaction_id, row.customer_id, row.product_id)
        else {
            continue;
        };

        let quantity = row
            .quantity
            .as_deref()
            .ok_or(FieldError::Missing)
            .and_then(|v| parse_count("quantity", v));
        let unit_price = row
            .unit_price
            .as_deref()
            .ok_or(FieldError::Missing)
            .and_then(|v| parse_amount("unit_price", v));
        let (quantity, unit_price) = match (quantity, unit_price) {
            (Ok(quantity), Ok(unit_price)) => (quantity, unit_price),
            (Err(e), _) => {
                drop_unpriced(&transaction_id, "quantity", e, sink);
                continue;
            }
            (_, Err(e)) => {
                drop_unpriced(&transaction_id, "unit_price", e, sink);
                continue;
            }
        };

        let transaction_date = match row.transaction_date.as_deref().map(parse_date) {
            Some(Ok(date)) => Some(date),
            Some(Err(e)) => {
                sink.record(
                    Diagnostic::warning(SOURCE, format!("transaction_date: {e}")).with_row(&transaction_id),
                );
                None
            }
            None => None,
        };

        sales.push(Sale {
            transaction_id,
            customer_id,
            product_id,
            quantity,
            unit_price,
            transaction_date,
            status: row.status,
        });
    }

    info!("Cleaned sales data: {} of {} rows kept", sales.len(), raw.len());
    sales
}

/// A sale without a usable quantity or price has no total and is dropped.
fn drop_unpriced(id: &str, field: &str, error: FieldError, sink: &dyn DiagnosticSink) {
    sink.record(Diagnostic::warning(SOURCE, format!("dropped row: {field}: {error}")).with_row(id));
}
