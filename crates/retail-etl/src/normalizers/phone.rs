//! Phone number canonicalization.

use crate::error::FieldError;
use phonenumber::country;

/// Parse `raw` under `region` and render it as `+<country code>-<national>`.
///
/// The national part is the last ten digits of the national significant
/// number. A number that parses but fails the numbering-plan check for its
/// region is rejected.
pub fn parse_phone(raw: &str, region: country::Id) -> Result<String, FieldError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(FieldError::Missing);
    }

    let number = phonenumber::parse(Some(region), trimmed)
        .map_err(|_| FieldError::UnparseablePhone(trimmed.to_string()))?;

    if !phonenumber::is_valid(&number) {
        return Err(FieldError::InvalidPhone(trimmed.to_string()));
    }

    let national = number.national().value().to_string();
    let start = national.len().saturating_sub(10);
    Ok(format!("+{}-{}", number.code().value(), &national[start..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leading_zero_is_dropped() {
        assert_eq!(
            parse_phone("09876543210", country::Id::IN).unwrap(),
            "+91-9876543210"
        );
    }

    #[test]
    fn test_formats_converge() {
        let expected = "+91-9876543210";
        for raw in ["9876543210", "+91 98765 43210", "+91-9876543210", "98765-43210"] {
            assert_eq!(parse_phone(raw, country::Id::IN).unwrap(), expected, "input {raw}");
        }
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(parse_phone("abc", country::Id::IN).is_err());
    }

    #[test]
    fn test_malformed_numbers_are_rejected() {
        for raw in [
            "+",
            "+91",
            "FLOWERS",
            "0987654321098",
            "1234567890123456789012345",
        ] {
            assert!(parse_phone(raw, country::Id::IN).is_err(), "input {raw}");
        }
    }

    #[test]
    fn test_too_short_is_invalid() {
        assert!(parse_phone("12345", country::Id::IN).is_err());
    }

    #[test]
    fn test_blank_is_missing() {
        assert_eq!(parse_phone("   ", country::Id::IN), Err(FieldError::Missing));
    }
}
