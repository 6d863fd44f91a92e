//! Core types for the marksight pipeline
//!
//! The result types mirror the JSON surface exactly: an internally
//! tagged enum yields the `marksheet_type` key plus the type-specific
//! fields, while the combined OCR corpus is carried alongside for page
//! rendering but never serialized into the API response.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Declared type of an uploaded source document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentKind {
    Image,
    Pdf,
}

impl DocumentKind {
    /// Map a file extension (case-insensitive) to a document kind.
    ///
    /// Only the allowed upload set {png, jpg, jpeg, pdf} resolves;
    /// anything else is rejected at the boundary.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "png" | "jpg" | "jpeg" => Some(Self::Image),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }

    /// Resolve the kind from a path's extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }
}

/// Classification of a marksheet document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarksheetType {
    /// College transcript scored on the SPI/CPI (0-10] scheme.
    College,
    /// School board certificate scored in percentages [0-100].
    School,
}

/// Lower/upper bounds for GPA-scale values: `0 < v <= 10`.
pub fn is_valid_gpa(v: f64) -> bool {
    v > 0.0 && v <= 10.0
}

/// Bounds for percentage values: `0 <= p <= 100`.
pub fn is_valid_percentage(p: f64) -> bool {
    (0.0..=100.0).contains(&p)
}

/// Extracted figures for one marksheet.
///
/// Fields are independently optional: extraction is best-effort and a
/// result with every field unresolved is still a successful response.
/// Every value present satisfies its scheme's bounds; candidates that
/// fail the bound are discarded during extraction, never clamped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "marksheet_type", rename_all = "lowercase")]
pub enum ExtractionResult {
    College {
        spi: Option<f64>,
        cpi: Option<f64>,
    },
    School {
        percentage_10th: Option<f64>,
        percentage_12th: Option<f64>,
    },
}

impl ExtractionResult {
    pub fn marksheet_type(&self) -> MarksheetType {
        match self {
            Self::College { .. } => MarksheetType::College,
            Self::School { .. } => MarksheetType::School,
        }
    }
}

/// A full pipeline outcome: the structured result plus the combined
/// OCR corpus it was parsed from. The corpus is exposed for the human
/// facing page rendering and debugging only.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub result: ExtractionResult,
    pub raw_text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_kind_from_extension() {
        assert_eq!(DocumentKind::from_extension("png"), Some(DocumentKind::Image));
        assert_eq!(DocumentKind::from_extension("JPG"), Some(DocumentKind::Image));
        assert_eq!(DocumentKind::from_extension("jpeg"), Some(DocumentKind::Image));
        assert_eq!(DocumentKind::from_extension("pdf"), Some(DocumentKind::Pdf));
        assert_eq!(DocumentKind::from_extension("gif"), None);
        assert_eq!(DocumentKind::from_extension("exe"), None);
    }

    #[test]
    fn test_document_kind_from_path() {
        assert_eq!(
            DocumentKind::from_path(Path::new("uploads/sem3.PDF")),
            Some(DocumentKind::Pdf)
        );
        assert_eq!(DocumentKind::from_path(Path::new("noext")), None);
    }

    #[test]
    fn test_bounds() {
        assert!(is_valid_gpa(7.85));
        assert!(is_valid_gpa(10.0));
        assert!(!is_valid_gpa(0.0));
        assert!(!is_valid_gpa(10.01));
        assert!(is_valid_percentage(0.0));
        assert!(is_valid_percentage(100.0));
        assert!(!is_valid_percentage(100.5));
        assert!(!is_valid_percentage(-1.0));
    }

    #[test]
    fn test_college_result_serialization() {
        let result = ExtractionResult::College {
            spi: Some(7.85),
            cpi: Some(8.2),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["marksheet_type"], "college");
        assert_eq!(json["spi"], 7.85);
        assert_eq!(json["cpi"], 8.2);
    }

    #[test]
    fn test_school_result_serialization_with_nulls() {
        let result = ExtractionResult::School {
            percentage_10th: Some(89.5),
            percentage_12th: None,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["marksheet_type"], "school");
        assert_eq!(json["percentage_10th"], 89.5);
        assert!(json["percentage_12th"].is_null());
    }
}
