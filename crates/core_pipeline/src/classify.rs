//! Document classifier
//!
//! Decides whether an OCR corpus came from a college transcript
//! (SPI/CPI scheme) or a school board certificate (percentage scheme)
//! by scoring two small keyword vocabularies. Ambiguous or empty input
//! defaults to college; that bias is deliberate, not a guess for later
//! second-guessing.

use crate::types::MarksheetType;
use once_cell::sync::Lazy;
use regex::Regex;

const COLLEGE_KEYWORDS: [&str; 8] = [
    "SPI",
    "CPI",
    "SGPA",
    "CGPA",
    "SEMESTER",
    "CUMULATIVE",
    "CREDITS",
    "GRADE POINTS",
];

const SCHOOL_KEYWORDS: [&str; 8] = [
    "10TH",
    "12TH",
    "TENTH",
    "TWELFTH",
    "CLASS X",
    "CLASS XII",
    "SECONDARY",
    "HIGHER SECONDARY",
];

static PERCENT_OCCURRENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+\.?\d*\s*%").unwrap());

/// Classify a combined OCR corpus.
pub fn detect_marksheet_type(text: &str) -> MarksheetType {
    let upper = text.to_uppercase();

    let college_count = COLLEGE_KEYWORDS.iter().filter(|k| upper.contains(*k)).count();
    let school_count = SCHOOL_KEYWORDS.iter().filter(|k| upper.contains(*k)).count();
    let percent_count = PERCENT_OCCURRENCE.find_iter(&upper).count();

    // The two abbreviations are diagnostic on their own: a school
    // certificate never prints SPI or CPI.
    if college_count > school_count || upper.contains("SPI") || upper.contains("CPI") {
        MarksheetType::College
    } else if school_count > 0 || percent_count > 0 {
        MarksheetType::School
    } else {
        MarksheetType::College
    }
}
