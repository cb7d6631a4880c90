use super::{TrimText, drop_missing_key, keep_first_by_key};
use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::normalizers::{FieldNormalizer, derive_surrogate_id, trim_field};
use crate::types::{Customer, RawCustomer, RawRecord};
use crate::utils::title_case;
use phonenumber::country;
use std::collections::HashMap;
use tracing::info;

const SOURCE: &str = RawCustomer::SOURCE;

/// Placeholder email for customers whose source row has none.
pub fn placeholder_email(customer_id: &str) -> String {
    format!("unknown_email_{customer_id}")
}

/// Clean raw customer rows.
///
/// Steps, in order: surrogate id, trim, drop rows without id, collapse
/// duplicate ids (first kept), fill missing email, normalize phone,
/// title-case city, normalize registration date, re-trim.
pub fn clean_customers(
    raw: &[RawCustomer],
    region: country::Id,
    sink: &dyn DiagnosticSink,
) -> Vec<Customer> {
    let normalizer = FieldNormalizer::new(SOURCE, region, sink);

    let rows: Vec<(usize, RawCustomer)> = raw
        .iter()
        .cloned()
        .map(|mut row| {
            row.customer_id = derive_surrogate_id(row.customer_id.as_deref());
            row.trim_text()
        })
        .enumerate()
        .collect();

    let rows = drop_missing_key(rows, SOURCE, "customer_id", |r| r.customer_id.as_deref(), sink);
    let rows = keep_first_by_key(rows, SOURCE, |r| r.customer_id.as_deref(), sink);

    let mut email_owners: HashMap<String, String> = HashMap::new();
    let mut customers = Vec::with_capacity(rows.len());

    for (_, row) in rows {
        let Some(customer_id) = row.customer_id else {
            continue;
        };

        let email = row
            .email
            .unwrap_or_else(|| placeholder_email(&customer_id));
        if let Some(owner) = email_owners.insert(email.clone(), customer_id.clone()) {
            sink.record(
                Diagnostic::warning(
                    SOURCE,
                    format!("email '{email}' is also used by customer {owner}; the store will reject one of them"),
                )
                .with_row(&customer_id),
            );
        }

        let phone = normalizer.normalize_phone(&customer_id, row.phone.as_deref());
        let city = row.city.map(|c| title_case(&c));
        let registration_date = normalizer.normalize_date(
            &customer_id,
            "registration_date",
            row.registration_date.as_deref(),
        );

        customers.push(Customer {
            first_name: trim_field(row.first_name),
            last_name: trim_field(row.last_name),
            email: email.trim().to_string(),
            phone: trim_field(phone),
            city: trim_field(city),
            registration_date: trim_field(registration_date),
            customer_id,
        });
    }

    info!("Cleaned customers data: {} of {} rows kept", customers.len(), raw.len());
    customers
}
