//! Numeric field parsing.

use crate::error::FieldError;
use crate::utils::parse_numeric_string;

/// 2^63, the first float past `i64::MAX`.
const I64_LIMIT: f64 = 9_223_372_036_854_775_808.0;

/// Parse a monetary amount. Currency symbols and thousands separators are
/// accepted.
pub fn parse_amount(field: &'static str, raw: &str) -> Result<f64, FieldError> {
    parse_numeric_string(raw).ok_or_else(|| invalid(field, raw))
}

/// Parse a whole count such as a quantity or stock level.
///
/// Accepts `"3"`, `"3.0"` and `"1,200"`; rejects fractions and values
/// outside the `i64` range.
pub fn parse_count(field: &'static str, raw: &str) -> Result<i64, FieldError> {
    let value = parse_numeric_string(raw).ok_or_else(|| invalid(field, raw))?;
    whole_number(field, value)
}

/// Convert an integral float to `i64` without saturating.
pub fn whole_number(field: &'static str, value: f64) -> Result<i64, FieldError> {
    if value.fract() != 0.0 || !(-I64_LIMIT..I64_LIMIT).contains(&value) {
        return Err(invalid(field, &value.to_string()));
    }
    Ok(value as i64)
}

fn invalid(field: &'static str, raw: &str) -> FieldError {
    FieldError::InvalidNumber {
        field,
        value: raw.trim().to_string(),
    }
}
