//! Text normalization helpers shared by the merger and aggregator.

use crate::types::TitleKey;

/// Zero-width characters stripped before titles are compared.
const ZERO_WIDTH: [char; 4] = ['\u{200B}', '\u{200C}', '\u{200D}', '\u{FEFF}'];

/// Collapse runs of whitespace into single spaces and trim.
pub fn normalize_inline_whitespace<T: AsRef<str>>(text: T) -> String {
    let mut normalized = String::new();
    let mut seen_space = false;
    for ch in text.as_ref().chars() {
        if ch.is_whitespace() {
            if !seen_space {
                normalized.push(' ');
                seen_space = true;
            }
        } else {
            normalized.push(ch);
            seen_space = false;
        }
    }
    normalized.trim().to_string()
}

/// Normalize a title into its join-key form: zero-width characters stripped,
/// whitespace runs collapsed, trimmed. Case is preserved.
pub fn normalize_title<T: AsRef<str>>(title: T) -> TitleKey {
    let mut cleaned = String::with_capacity(title.as_ref().len());
    for ch in title.as_ref().chars() {
        if !ZERO_WIDTH.contains(&ch) {
            cleaned.push(ch);
        }
    }
    normalize_inline_whitespace(cleaned)
}

/// Split a delimited multi-valued field into trimmed non-empty entries.
///
/// Semicolon is the canonical delimiter; comma is accepted when no semicolon
/// is present (crowd-form exports use it).
pub fn split_list(value: &str) -> Vec<String> {
    let delimiter = if value.contains(';') { ';' } else { ',' };
    value
        .split(delimiter)
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse a delimited score list into numeric values, ignoring entries that
/// are not numbers (rating strings like `6: accept` keep their leading value).
pub fn parse_scores(value: &str) -> Vec<f64> {
    split_list(value)
        .iter()
        .filter_map(|entry| {
            let numeric = entry
                .split(|ch: char| ch == ':' || ch.is_whitespace())
                .next()
                .unwrap_or("");
            numeric.parse::<f64>().ok()
        })
        .collect()
}

/// Mean of a score list, `None` when empty.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}
