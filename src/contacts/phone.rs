//! Phone number normalization and recipient matching.
//!
//! CHANGELOG:
//! - 10/19/2026 - E.164 normalization for feed rows, identifier variants
//! - 01/10/2026 - Initial implementation

/// Digits of `s`, everything else dropped.
pub fn digits_only(s: &str) -> String {
    s.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Normalize a raw feed value to E.164.
///
/// Returns `None` when the value can't be turned into a dialable number.
pub fn normalize_phone(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let compact: String = trimmed.chars().filter(|c| !c.is_whitespace()).collect();

    // Already international: keep as-is minus spaces
    if let Some(rest) = compact.strip_prefix('+') {
        if (8..=20).contains(&rest.len()) && rest.chars().all(|c| c.is_ascii_digit()) {
            return Some(compact);
        }
    }

    let digits = digits_only(trimmed);
    match digits.len() {
        11 if digits.starts_with('1') => Some(format!("+{}", digits)),
        10 => Some(format!("+1{}", digits)),
        8..=15 if !digits.starts_with('0') => Some(format!("+{}", digits)),
        _ => None,
    }
}

/// Identifier forms to try when resolving a participant.
///
/// The raw identifier first, then the same identifier with its leading `+`
/// toggled. Email handles have no variant.
pub fn identifier_variants(recipient: &str) -> Vec<String> {
    let raw = recipient.trim().to_string();
    let mut variants = vec![raw.clone()];

    if raw.contains('@') || raw.is_empty() {
        return variants;
    }

    let toggled = match raw.strip_prefix('+') {
        Some(rest) => rest.to_string(),
        None => format!("+{}", raw),
    };
    if !toggled.is_empty() && toggled != raw {
        variants.push(toggled);
    }
    variants
}

/// Minimum digits for suffix matching; shorter handles must match exactly.
const MIN_SUFFIX_DIGITS: usize = 7;

/// Whether two handles refer to the same recipient.
///
/// Phone handles match when one digit string ends with the other (country
/// code present on one side only). Email handles compare case-insensitively.
pub fn same_recipient(a: &str, b: &str) -> bool {
    let (a, b) = (a.trim(), b.trim());
    if a.eq_ignore_ascii_case(b) {
        return true;
    }
    if a.contains('@') || b.contains('@') {
        return false;
    }

    let (da, db) = (digits_only(a), digits_only(b));
    if da.len().min(db.len()) < MIN_SUFFIX_DIGITS {
        return !da.is_empty() && da == db;
    }
    da.ends_with(&db) || db.ends_with(&da)
}
