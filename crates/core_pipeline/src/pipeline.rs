//! End-to-end extraction pipeline
//!
//! Wires the stages together for one request: decode the source (or
//! rasterize a PDF's first page), expand it into the preprocessing
//! variants, fan OCR out over all of them, combine the attempts into a
//! corpus, classify the document, and run the matching field extractor.
//!
//! Everything is request-local and synchronous; nothing is shared
//! between requests except the external OCR engine itself.

use crate::classify::detect_marksheet_type;
use crate::error::PipelineError;
use crate::ocr::{self, OcrEngineConfig};
use crate::pdf;
use crate::preprocess;
use crate::types::{DocumentKind, Extraction, ExtractionResult, MarksheetType};
use crate::{college, school};
use image::DynamicImage;
use std::path::Path;
use tracing::{debug, info};

/// Pipeline configuration, resolved once at startup.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub ocr: OcrEngineConfig,
    /// Resolution for rasterizing PDF first pages.
    pub pdf_dpi: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            ocr: OcrEngineConfig::default(),
            pdf_dpi: pdf::DEFAULT_DPI,
        }
    }
}

impl PipelineConfig {
    /// Resolve engine overrides from the environment.
    pub fn from_env() -> Self {
        Self {
            ocr: OcrEngineConfig::from_env(),
            pdf_dpi: pdf::DEFAULT_DPI,
        }
    }
}

/// Run the full pipeline over a source file whose kind is declared by
/// the upload boundary.
pub fn extract_from_document(
    path: &Path,
    kind: DocumentKind,
    config: &PipelineConfig,
) -> Result<Extraction, PipelineError> {
    let (image, original_bytes) = load_source(path, kind, config)?;
    Ok(extract_from_image(&image, &original_bytes, config))
}

/// Convenience entry point that resolves the kind from the extension.
pub fn extract_from_path(path: &Path, config: &PipelineConfig) -> Result<Extraction, PipelineError> {
    let kind = DocumentKind::from_path(path).ok_or_else(|| PipelineError::UnsupportedExtension {
        extension: path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_string(),
    })?;
    extract_from_document(path, kind, config)
}

/// Decode the source into a raster plus the encoded bytes used for the
/// final OCR attempt over the unprocessed original.
fn load_source(
    path: &Path,
    kind: DocumentKind,
    config: &PipelineConfig,
) -> Result<(DynamicImage, Vec<u8>), PipelineError> {
    match kind {
        DocumentKind::Image => {
            let bytes = std::fs::read(path).map_err(|e| PipelineError::SourceRead {
                path: path.to_path_buf(),
                source: e,
            })?;
            let image =
                image::load_from_memory(&bytes).map_err(|e| PipelineError::ImageDecode {
                    path: path.to_path_buf(),
                    source: e,
                })?;
            Ok((image, bytes))
        }
        DocumentKind::Pdf => {
            let image = pdf::render_first_page(path, config.pdf_dpi)?;
            let mut bytes = Vec::new();
            image
                .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
                .map_err(PipelineError::ImageEncode)?;
            Ok((image, bytes))
        }
    }
}

/// Run preprocessing, OCR fan-out, classification, and extraction over
/// an already-decoded raster.
pub fn extract_from_image(
    image: &DynamicImage,
    original_bytes: &[u8],
    config: &PipelineConfig,
) -> Extraction {
    let variants = preprocess::preprocess(image);
    let attempts = ocr::run_fanout(&config.ocr, &variants, original_bytes);
    let corpus = ocr::combine_attempts(&attempts);
    debug!("combined corpus: {} bytes", corpus.len());

    let extraction = extract_from_corpus(&corpus);
    info!(
        "extraction complete: {:?}",
        extraction.result.marksheet_type()
    );
    extraction
}

/// Classify a corpus and run the matching field extractor. Split out so
/// the text path is testable without an OCR engine installed.
pub fn extract_from_corpus(corpus: &str) -> Extraction {
    let result = match detect_marksheet_type(corpus) {
        MarksheetType::College => {
            let fields = college::extract(corpus);
            ExtractionResult::College {
                spi: fields.spi,
                cpi: fields.cpi,
            }
        }
        MarksheetType::School => {
            let fields = school::extract(corpus);
            ExtractionResult::School {
                percentage_10th: fields.percentage_10th,
                percentage_12th: fields.percentage_12th,
            }
        }
    };
    Extraction {
        result,
        raw_text: corpus.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_corpus_defaults_to_college_with_unresolved_fields() {
        let extraction = extract_from_corpus("");
        assert_eq!(
            extraction.result,
            ExtractionResult::College {
                spi: None,
                cpi: None
            }
        );
        assert_eq!(extraction.raw_text, "");
    }

    #[test]
    fn test_college_corpus_routes_to_college_extractor() {
        let extraction =
            extract_from_corpus("Semester Performance SPI: 7.85 Cumulative Performance CPI: 8.20");
        assert_eq!(
            extraction.result,
            ExtractionResult::College {
                spi: Some(7.85),
                cpi: Some(8.20)
            }
        );
    }

    #[test]
    fn test_school_corpus_routes_to_school_extractor() {
        let extraction =
            extract_from_corpus("Board Certificate Class X 89.50% and Class XII 92.10%");
        assert_eq!(
            extraction.result,
            ExtractionResult::School {
                percentage_10th: Some(89.50),
                percentage_12th: Some(92.10)
            }
        );
    }

    #[test]
    fn test_unsupported_extension_is_fatal() {
        let err = extract_from_path(Path::new("marksheet.gif"), &PipelineConfig::default())
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::UnsupportedExtension { .. }
        ));
    }

    #[test]
    fn test_blank_image_end_to_end() {
        // A uniform white raster yields no text from any OCR attempt,
        // whether or not an engine is installed, so the whole pipeline
        // must come back with the empty-corpus default.
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blank.png");
        let blank = image::GrayImage::from_pixel(120, 80, image::Luma([255u8]));
        blank.save(&path).unwrap();

        let extraction = extract_from_path(&path, &PipelineConfig::default()).unwrap();
        assert_eq!(
            extraction.result,
            ExtractionResult::College {
                spi: None,
                cpi: None
            }
        );
    }

    #[test]
    fn test_missing_image_is_fatal() {
        let err = extract_from_path(
            Path::new("/nonexistent/marksheet.png"),
            &PipelineConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::SourceRead { .. }));
    }
}
