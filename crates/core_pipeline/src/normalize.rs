//! Decimal-repair normalizer
//!
//! Tesseract routinely drops the decimal point from GPA-scale figures
//! on table scans, turning `7.98` into `798`. On the 0-10 scale those
//! values always start with a high digit, so any bare three-digit token
//! leading with 6-9 gets its point re-inserted. A fixed table of known
//! specific misreads is applied afterwards as a literal pass.
//!
//! The rewrite runs once over the whole corpus, ahead of college field
//! extraction only, and is idempotent: correctly punctuated text is
//! left untouched.

use once_cell::sync::Lazy;
use regex::Regex;

// Maximal run of digits and interior decimal points. Matching the whole
// run keeps `798.5` and `17985` out of reach of the repair, which only
// applies to a bare three-digit token.
static NUMERIC_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+(?:\.\d+)*").unwrap());

/// Known specific three-digit misreads, substituted literally after the
/// generic pass.
const KNOWN_MISREADS: [(&str, &str); 12] = [
    ("782", "7.82"),
    ("798", "7.98"),
    ("856", "8.56"),
    ("870", "8.70"),
    ("878", "8.78"),
    ("890", "8.90"),
    ("785", "7.85"),
    ("792", "7.92"),
    ("865", "8.65"),
    ("875", "8.75"),
    ("885", "8.85"),
    ("895", "8.95"),
];

static KNOWN_MISREAD_PATTERNS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    KNOWN_MISREADS
        .iter()
        .map(|(from, to)| (Regex::new(&format!(r"\b{from}\b")).unwrap(), *to))
        .collect()
});

/// Re-insert decimal points dropped by OCR from GPA-scale numbers.
pub fn repair_missing_decimals(text: &str) -> String {
    let mut fixed = String::with_capacity(text.len() + 8);
    let mut last = 0;
    for m in NUMERIC_RUN.find_iter(text) {
        fixed.push_str(&text[last..m.start()]);
        let run = m.as_str();
        if is_bare_gpa_token(text, m.start(), m.end(), run) {
            fixed.push_str(&run[..1]);
            fixed.push('.');
            fixed.push_str(&run[1..]);
        } else {
            fixed.push_str(run);
        }
        last = m.end();
    }
    fixed.push_str(&text[last..]);
    for (pattern, replacement) in KNOWN_MISREAD_PATTERNS.iter() {
        fixed = replace_bare_matches(&fixed, pattern, replacement);
    }
    fixed
}

/// Substitute every match of `pattern` that stands as a bare token.
/// Regex `\b` alone treats `.` as a boundary, which would reach into
/// `798.5`; the neighbor check keeps the literal pass as strict as the
/// generic one.
fn replace_bare_matches(text: &str, pattern: &Regex, replacement: &str) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    let mut last = 0;
    for m in pattern.find_iter(text) {
        out.push_str(&text[last..m.start()]);
        if is_bare_at(text, m.start(), m.end()) {
            out.push_str(replacement);
        } else {
            out.push_str(m.as_str());
        }
        last = m.end();
    }
    out.push_str(&text[last..]);
    out
}

/// A run qualifies for repair only when it is a bare three-digit token
/// with a high leading digit, not embedded in an identifier or a longer
/// number.
fn is_bare_gpa_token(text: &str, start: usize, end: usize, run: &str) -> bool {
    if run.len() != 3 || run.contains('.') || !matches!(run.as_bytes()[0], b'6'..=b'9') {
        return false;
    }
    is_bare_at(text, start, end)
}

/// Neither neighbor may be a character that would make the span part of
/// a longer number or identifier.
fn is_bare_at(text: &str, start: usize, end: usize) -> bool {
    let embedded_before = text[..start]
        .chars()
        .next_back()
        .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
    let embedded_after = text[end..]
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
    !embedded_before && !embedded_after
}
