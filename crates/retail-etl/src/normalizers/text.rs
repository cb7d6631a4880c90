//! Text field helpers: trimming, category vocabulary and key surrogation.

use crate::utils::title_case;

/// Controlled category vocabulary, matched by substring on the lower-cased value.
const CATEGORY_VOCABULARY: [(&str, &str); 3] = [
    ("electronic", "Electronics"),
    ("fashion", "Fashion"),
    ("grocer", "Groceries"),
];

/// Trim a text field. Text that is empty after trimming becomes absent.
pub fn trim_field(value: Option<String>) -> Option<String> {
    let value = value?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else if trimmed.len() == value.len() {
        Some(value)
    } else {
        Some(trimmed.to_string())
    }
}

/// Map a raw category onto the controlled vocabulary.
///
/// Values matching none of the vocabulary stems are title-cased.
pub fn normalize_category(raw: Option<&str>) -> Option<String> {
    let trimmed = raw?.trim();
    if trimmed.is_empty() {
        return None;
    }
    let lowered = trimmed.to_lowercase();
    let canonical = CATEGORY_VOCABULARY
        .iter()
        .find(|(stem, _)| lowered.contains(stem))
        .map(|(_, name)| name.to_string());
    Some(canonical.unwrap_or_else(|| title_case(&lowered)))
}

/// Derive the internal surrogate key from an external prefixed identifier
/// by dropping its first character (`"C0001"` becomes `"0001"`).
pub fn derive_surrogate_id(raw: Option<&str>) -> Option<String> {
    let mut chars = raw?.chars();
    chars.next();
    Some(chars.as_str().to_string())
}
