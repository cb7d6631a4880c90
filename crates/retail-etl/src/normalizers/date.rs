//! Date canonicalization to ISO `YYYY-MM-DD`.
//!
//! Explicit formats are tried first, in a fixed order, so ambiguous inputs
//! such as `03/04/2023` always resolve the same way (day first for slashes).
//! Anything else goes through a lenient pass that accepts timestamps, month
//! names, dotted and compact forms.

use crate::error::FieldError;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;

/// Formats tried first, in order. The first successful parse wins.
pub const EXPLICIT_FORMATS: [&str; 5] = ["%Y-%m-%d", "%d/%m/%Y", "%m-%d-%Y", "%d-%m-%Y", "%m/%d/%Y"];

const LENIENT_DATE_FORMATS: [&str; 12] = [
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%d.%m.%Y",
    "%d %B %Y",
    "%d %b %Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%B %d %Y",
    "%b %d %Y",
    "%d-%b-%Y",
    "%d-%B-%Y",
    "%b-%d-%Y",
];

const LENIENT_DATETIME_FORMATS: [&str; 8] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%m/%d/%Y %H:%M:%S",
];

static COMPACT_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})(\d{2})(\d{2})$").expect("Invalid regex: compact date"));

/// Parse a raw date string and render it as `YYYY-MM-DD`.
pub fn parse_date(raw: &str) -> Result<String, FieldError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(FieldError::Missing);
    }

    parse_explicit(trimmed)
        .or_else(|| parse_lenient(trimmed))
        .map(|date| date.format("%Y-%m-%d").to_string())
        .ok_or_else(|| FieldError::UnparseableDate(trimmed.to_string()))
}

fn parse_explicit(s: &str) -> Option<NaiveDate> {
    EXPLICIT_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

fn parse_lenient(s: &str) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.date_naive());
    }

    if let Some(date) = LENIENT_DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
    {
        return Some(date.date());
    }

    if let Some(date) = LENIENT_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
    {
        return Some(date);
    }

    let caps = COMPACT_DATE.captures(s)?;
    let year = caps[1].parse().ok()?;
    let month = caps[2].parse().ok()?;
    let day = caps[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}
