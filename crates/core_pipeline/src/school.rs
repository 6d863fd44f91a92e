//! School field extractor
//!
//! Recovers 10th- and 12th-grade percentages from a combined OCR
//! corpus. Mirrors the college extractor's layering for the [0, 100]
//! percentage scheme: percent-sign and label-prefixed patterns,
//! class-level keyword context scanned a couple of lines around each
//! occurrence, a positional fallback over the document, and a final
//! board-specific pass (CBSE/ICSE/state) that only fills still-open
//! slots. Resolved values are rounded to two decimal places.

use crate::types::is_valid_percentage;
use once_cell::sync::Lazy;
use regex::Regex;

/// Resolved school percentages.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SchoolFields {
    pub percentage_10th: Option<f64>,
    pub percentage_12th: Option<f64>,
}

static PERCENT_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)(\d+\.?\d*)\s*%",
        r"(?i)Percentage[:\s]*(\d+\.?\d*)",
        r"(?i)Total[:\s]*(\d+\.?\d*)",
        r"(?i)Result[:\s]*(\d+\.?\d*)",
        r"(?i)Grade[:\s]*(\d+\.?\d*)",
        r"(?i)(\d+\.?\d*)\s*percent",
        r"(?i)(\d+\.?\d*)\s*per\s*cent",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static BOARD_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)CBSE.*?(\d+\.?\d*)",
        r"(?i)ICSE.*?(\d+\.?\d*)",
        r"(?i)(?:State|Board).*?(\d+\.?\d*)",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

const TENTH_KEYWORDS: [&str; 6] = [
    "10TH",
    "TENTH",
    "CLASS X",
    "CLASS 10",
    "SECONDARY",
    "MATRICULATION",
];

const TWELFTH_KEYWORDS: [&str; 6] = [
    "12TH",
    "TWELFTH",
    "CLASS XII",
    "CLASS 12",
    "HIGHER SECONDARY",
    "SENIOR SECONDARY",
];

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Extract 10th- and 12th-grade percentages from a combined OCR corpus.
pub fn extract(text: &str) -> SchoolFields {
    let collapsed = WHITESPACE.replace_all(text.trim(), " ").into_owned();
    let lines: Vec<String> = text.lines().map(|l| l.to_uppercase()).collect();

    // Every in-range percentage with its position, in document order,
    // for the positional fallback.
    let mut all_percentages: Vec<(f64, usize)> = Vec::new();
    for pattern in PERCENT_PATTERNS.iter() {
        for caps in pattern.captures_iter(&collapsed) {
            if let Some(m) = caps.get(1) {
                if let Ok(v) = m.as_str().parse::<f64>() {
                    if is_valid_percentage(v) {
                        all_percentages.push((v, m.start()));
                    }
                }
            }
        }
    }
    all_percentages.sort_by_key(|(_, pos)| *pos);

    // Keyword context: the text after the keyword on its own line is
    // preferred, then the surrounding two lines either side, so corpora
    // where both classes share one line still resolve in order.
    let mut percentage_10th = context_value(&lines, &TENTH_KEYWORDS);
    let mut percentage_12th = context_value(&lines, &TWELFTH_KEYWORDS);

    // Positional fallback: first two in-range percentages in document
    // order, only when context resolved neither field.
    if percentage_10th.is_none() && percentage_12th.is_none() && !all_percentages.is_empty() {
        percentage_10th = all_percentages.first().map(|(v, _)| round2(*v));
        percentage_12th = all_percentages.get(1).map(|(v, _)| round2(*v));
    }

    // Board-specific pass fills whatever is still open.
    for pattern in BOARD_PATTERNS.iter() {
        for caps in pattern.captures_iter(&collapsed) {
            let value = caps
                .get(1)
                .and_then(|m| m.as_str().parse::<f64>().ok())
                .filter(|v| is_valid_percentage(*v));
            if let Some(v) = value {
                if percentage_10th.is_none() {
                    percentage_10th = Some(round2(v));
                } else if percentage_12th.is_none() {
                    percentage_12th = Some(round2(v));
                }
            }
        }
    }

    SchoolFields {
        percentage_10th,
        percentage_12th,
    }
}

/// First in-range percentage associated with any keyword occurrence.
fn context_value(lines: &[String], keywords: &[&str]) -> Option<f64> {
    for (i, line) in lines.iter().enumerate() {
        let Some(at) = keywords.iter().filter_map(|k| line.find(k)).min() else {
            continue;
        };

        // After the keyword on the same line first.
        if let Some(v) = first_percentage(&line[at..]) {
            return Some(round2(v));
        }
        // Then the window of two lines either side, in order.
        let start = i.saturating_sub(2);
        let end = (i + 3).min(lines.len());
        for candidate in &lines[start..end] {
            if let Some(v) = first_percentage(candidate) {
                return Some(round2(v));
            }
        }
    }
    None
}

/// First in-range match over the percentage pattern list, in priority
/// order.
fn first_percentage(text: &str) -> Option<f64> {
    for pattern in PERCENT_PATTERNS.iter() {
        if let Some(v) = pattern
            .captures(text)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<f64>().ok())
            .filter(|v| is_valid_percentage(*v))
        {
            return Some(v);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_line_class_context() {
        let fields = extract("Board Result Class X marks 89.50% and Class XII marks 92.10%");
        assert_eq!(fields.percentage_10th, Some(89.50));
        assert_eq!(fields.percentage_12th, Some(92.10));
    }

    #[test]
    fn test_multi_line_class_context() {
        let text =
            "SECONDARY SCHOOL EXAMINATION\nPercentage: 88.40\n\n\nHIGHER SECONDARY EXAMINATION\nPercentage: 91.25";
        let fields = extract(text);
        assert_eq!(fields.percentage_10th, Some(88.40));
        assert_eq!(fields.percentage_12th, Some(91.25));
    }

    #[test]
    fn test_context_looks_at_nearby_lines() {
        let text = "Class 10 Certificate\nsubject rows here\n76.80 %";
        let fields = extract(text);
        assert_eq!(fields.percentage_10th, Some(76.80));
        assert_eq!(fields.percentage_12th, None);
    }

    #[test]
    fn test_positional_fallback_in_document_order() {
        let fields = extract("marks 81.20 % then later 90.00 %");
        assert_eq!(fields.percentage_10th, Some(81.20));
        assert_eq!(fields.percentage_12th, Some(90.00));
    }

    #[test]
    fn test_positional_fallback_single_value() {
        let fields = extract("scored 74.5%");
        assert_eq!(fields.percentage_10th, Some(74.50));
        assert_eq!(fields.percentage_12th, None);
    }

    #[test]
    fn test_board_pass_fills_open_slots() {
        let fields = extract("CBSE Examination aggregate 91.6");
        assert_eq!(fields.percentage_10th, Some(91.60));
        assert_eq!(fields.percentage_12th, None);
    }

    #[test]
    fn test_out_of_range_percentages_discarded() {
        let fields = extract("scored 140.0% somehow");
        assert_eq!(fields.percentage_10th, None);
        assert_eq!(fields.percentage_12th, None);
    }

    #[test]
    fn test_values_rounded_to_two_decimals() {
        let fields = extract("Class X result 76.125%");
        assert_eq!(fields.percentage_10th, Some(76.13));
    }

    #[test]
    fn test_empty_input_resolves_nothing() {
        assert_eq!(extract(""), SchoolFields::default());
    }
}
