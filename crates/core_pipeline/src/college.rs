//! College field extractor
//!
//! Recovers SPI and CPI from a combined OCR corpus using three ordered
//! strategies per field: label-aware regex templates, a table-row scan
//! modeling a credits/points/grade-points/index row, and keyword
//! context over the corpus lines with a positional last resort. Each
//! strategy only fills fields the earlier ones left open, and every
//! candidate must sit inside (0, 10] or it is discarded outright.
//!
//! This function never fails: malformed or empty input produces
//! unresolved fields, not errors.

use crate::normalize::repair_missing_decimals;
use crate::types::is_valid_gpa;
use once_cell::sync::Lazy;
use regex::Regex;

/// Resolved college figures. `spi` is always the semester figure and
/// `cpi` the cumulative one; the legacy reporting path that swapped the
/// two keys is not reproduced.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CollegeFields {
    pub spi: Option<f64>,
    pub cpi: Option<f64>,
}

static SPI_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)Semester\s*Performance[\s\S]{0,160}?\bSPI\b[\s:]*([0-9]\.[0-9]{1,2})",
        r"(?i)\bSPI\b[\s:]*([0-9]\.[0-9]{1,2})",
        r"(?i)([0-9]\.[0-9]{1,2})\s*\bSPI\b",
        r"(?i)\bSGPA\b[\s:]*([0-9]\.[0-9]{1,2})",
        r"(?i)Semester[\s\S]{0,80}?GPA[\s:]*([0-9]\.[0-9]{1,2})",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static CPI_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)Cumulative\s*Performance[\s\S]{0,200}?\bCPI\b[\s:]*([0-9]\.[0-9]{1,2})",
        r"(?i)\bCPI\b[\s:]*([0-9]\.[0-9]{1,2})",
        r"(?i)([0-9]\.[0-9]{1,2})\s*\bCPI\b",
        r"(?i)\bCGPA\b[\s:]*([0-9]\.[0-9]{1,2})",
        r"(?i)Cumulative[\s\S]{0,80}?GPA[\s:]*([0-9]\.[0-9]{1,2})",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Stricter CPI-only subset used when both fields resolve identically.
static STRICT_CPI_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)\bCPI\b[\s:]*([0-9]\.[0-9]{1,2})",
        r"(?i)Cumulative\s*Performance[\s\S]{0,200}?\bCPI\b[\s:]*([0-9]\.[0-9]{1,2})",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

// A credits/points/grade-points/SPI row, optionally followed by the
// cumulative row in the same run.
static TABLE_ROW: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d+)\s+(\d+)\s+(\d+)\s+(\d+\.\d+)(?:\s+\d+\s+\d+\s+\d+\s+(\d+\.\d+))?").unwrap()
});

static DECIMAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+\.\d+").unwrap());
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Extract SPI and CPI from a combined OCR corpus.
pub fn extract(text: &str) -> CollegeFields {
    // Repair dropped decimal points before any pattern sees the text.
    let repaired = repair_missing_decimals(text);
    let collapsed = WHITESPACE.replace_all(repaired.trim(), " ").into_owned();

    let mut spi = None;
    let mut cpi = None;

    // Strategy 1: label-aware patterns, first in-range capture wins.
    for pattern in SPI_PATTERNS.iter() {
        if let Some(v) = first_in_range(pattern, &collapsed) {
            spi = Some(v);
            break;
        }
    }
    for pattern in CPI_PATTERNS.iter() {
        if let Some(v) = first_in_range(pattern, &collapsed) {
            cpi = Some(v);
            break;
        }
    }

    // Strategy 2: table rows. The fourth column of a numeric run is the
    // semester index, the eighth (when present) the cumulative one.
    for caps in TABLE_ROW.captures_iter(&collapsed) {
        if spi.is_none() {
            if let Some(v) = parse_in_range(caps.get(4).map(|m| m.as_str())) {
                spi = Some(v);
            }
        }
        if cpi.is_none() {
            if let Some(v) = parse_in_range(caps.get(5).map(|m| m.as_str())) {
                cpi = Some(v);
            }
        }
    }

    // Strategy 3: keyword context over real corpus lines, then position.
    if spi.is_none() || cpi.is_none() {
        let lines: Vec<&str> = repaired.lines().collect();
        for (i, line) in lines.iter().enumerate() {
            let upper = line.to_uppercase();
            let window_end = (i + 8).min(lines.len());

            if spi.is_none() && (upper.contains("SEMESTER") || upper.contains("SGPA")) {
                spi = lines[i..window_end]
                    .iter()
                    .flat_map(|l| DECIMAL.find_iter(l))
                    .filter_map(|m| m.as_str().parse::<f64>().ok())
                    .find(|v| is_valid_gpa(*v));
            }
            if cpi.is_none() && (upper.contains("CUMULATIVE") || upper.contains("CGPA")) {
                cpi = lines[i..window_end]
                    .iter()
                    .flat_map(|l| DECIMAL.find_iter(l))
                    .filter_map(|m| m.as_str().parse::<f64>().ok())
                    .find(|v| is_valid_gpa(*v) && Some(*v) != spi);
            }
        }

        let valid: Vec<f64> = DECIMAL
            .find_iter(&collapsed)
            .filter_map(|m| m.as_str().parse::<f64>().ok())
            .filter(|v| is_valid_gpa(*v))
            .collect();
        if spi.is_none() {
            spi = valid.first().copied();
        }
        if cpi.is_none() && valid.len() >= 2 {
            cpi = valid.last().copied();
        }
    }

    // Re-check bounds; out-of-range values unresolve, never clamp.
    spi = spi.filter(|v| is_valid_gpa(*v));
    cpi = cpi.filter(|v| is_valid_gpa(*v));

    // Identical figures usually mean one value was matched twice; try
    // the stricter CPI-only patterns for a distinct cumulative value.
    if spi.is_some() && spi == cpi {
        for pattern in STRICT_CPI_PATTERNS.iter() {
            if let Some(v) = first_in_range(pattern, &collapsed) {
                if Some(v) != spi {
                    cpi = Some(v);
                    break;
                }
            }
        }
    }

    CollegeFields { spi, cpi }
}

fn first_in_range(pattern: &Regex, text: &str) -> Option<f64> {
    pattern
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .filter(|v| is_valid_gpa(*v))
}

fn parse_in_range(capture: Option<&str>) -> Option<f64> {
    capture
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|v| is_valid_gpa(*v))
}
