//! Shared string helpers used by the normalizers and cleaners.

// =============================================================================
// Numeric Parsing
// =============================================================================

/// Characters commonly used in numeric formatting that should be stripped.
pub const NUMERIC_FORMAT_CHARS: [char; 6] = [',', '$', '₹', '€', '£', ' '];

/// Common error/missing value markers in raw exports.
pub const ERROR_MARKERS: [&str; 8] = [
    "error", "unknown", "n/a", "na", "null", "missing", "none", "nan",
];

/// Clean a string for numeric parsing by removing formatting characters.
///
/// ```rust,ignore
/// assert_eq!(clean_numeric_string("$1,234.56"), "1234.56");
/// ```
pub fn clean_numeric_string(s: &str) -> String {
    let mut result = s.trim().to_string();
    for c in NUMERIC_FORMAT_CHARS {
        result = result.replace(c, "");
    }
    result
}

/// Check if a string is an error/missing value marker.
pub fn is_error_marker(s: &str) -> bool {
    let lower = s.trim().to_ascii_lowercase();
    ERROR_MARKERS.iter().any(|&marker| lower == marker)
}

/// Try to parse a string as a finite `f64`.
///
/// Handles currency symbols and thousands separators.
pub fn parse_numeric_string(s: &str) -> Option<f64> {
    if is_error_marker(s) {
        return None;
    }
    let cleaned = clean_numeric_string(s);
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

// =============================================================================
// Text Utilities
// =============================================================================

/// Title-case a string: the first letter of every run of letters is upper
/// case, every other letter lower case.
///
/// Word boundaries are any non-alphabetic character, so `"o'neil"` becomes
/// `"O'Neil"` and `"new-delhi"` becomes `"New-Delhi"`.
pub fn title_case(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut previous_is_letter = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if previous_is_letter {
                result.extend(c.to_lowercase());
            } else {
                result.extend(c.to_uppercase());
            }
            previous_is_letter = true;
        } else {
            result.push(c);
            previous_is_letter = false;
        }
    }
    result
}
