use std::sync::LazyLock;

use regex::Regex;

use crate::models::DrugIdentity;

/// Order-independent key for a drug pair.
pub fn pair_key(a: &str, b: &str) -> (String, String) {
    let (a, b) = (a.trim().to_lowercase(), b.trim().to_lowercase());
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Sorted subject list for a pair finding, so (a, b) and (b, a) share an id.
pub fn pair_subjects(a: &DrugIdentity, b: &DrugIdentity) -> Vec<String> {
    let (first, second) = pair_key(a.as_str(), b.as_str());
    vec![first, second]
}

/// Normalize a free-text condition: lowercase, spaces and hyphens become `_`.
/// "Renal Impairment" and "renal-impairment" both become "renal_impairment".
pub fn normalize_condition(condition: &str) -> String {
    condition
        .trim()
        .to_lowercase()
        .split(|c: char| c.is_whitespace() || c == '-' || c == '_')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

/// Trim and lowercase a raw medication token.
pub fn clean_token(raw: &str) -> String {
    raw.trim().to_lowercase()
}

static RE_STRENGTH_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s*\d+(?:\.\d+)?\s*(?:mg|mcg|µg|g|ml|iu|%)?\s*$").unwrap()
});

/// Strip a trailing strength token ("metformin 500mg" -> "metformin").
/// Returns None when nothing was stripped or nothing would remain.
pub fn strip_strength(token: &str) -> Option<String> {
    let stripped = RE_STRENGTH_SUFFIX.replace(token, "");
    let stripped = stripped.trim();
    if stripped.is_empty() || stripped.len() == token.trim().len() {
        return None;
    }
    Some(stripped.to_string())
}

/// Format a numeric measure the way it reads in a note: integers without
/// a fractional part, everything else as given.
pub fn format_measure(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}
